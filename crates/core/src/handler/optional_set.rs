use super::{Context, Handler, Progress, Sequence};
use crate::error::{Result, WfdError};
use crate::protocol::Message;
use crate::transport::TimerId;

/// A [`Sequence`] of mandatory steps plus optional handlers that stay
/// armed for as long as the composite runs.
///
/// Routing is deliberately asymmetric:
///
/// | Operation | Checked first | Fallback |
/// |-----------|---------------|----------|
/// | `can_send` / `send` | optional handlers | mandatory sequence |
/// | `can_handle` / `handle` | mandatory sequence | optional handlers |
///
/// An optional handler that completes is reset and started again right
/// away. Only the mandatory sequence completes the composite. Any error,
/// from either side, resets the whole composite before it is returned.
pub struct OptionalSet<M: ?Sized> {
    mandatory: Sequence<M>,
    optional: Vec<Box<dyn Handler<M>>>,
    started: bool,
}

impl<M: ?Sized> OptionalSet<M> {
    pub fn new(mandatory: Sequence<M>) -> Self {
        Self {
            mandatory,
            optional: Vec::new(),
            started: false,
        }
    }

    /// Add an optional handler. Panics once the composite has started.
    pub fn push_optional(&mut self, handler: impl Handler<M> + 'static) {
        assert!(
            !self.started,
            "{}: cannot add {} after start",
            self.mandatory.name(),
            handler.name()
        );
        self.optional.push(Box::new(handler));
    }

    #[must_use]
    pub fn with_optional(mut self, handler: impl Handler<M> + 'static) -> Self {
        self.push_optional(handler);
        self
    }

    /// Optional handlers, in routing order.
    pub fn optional_handlers(&self) -> impl Iterator<Item = &dyn Handler<M>> {
        self.optional.iter().map(|handler| handler.as_ref())
    }

    fn fail(&mut self, error: WfdError, ctx: &mut Context<'_, M>) -> Result<Progress> {
        tracing::debug!(state = self.mandatory.name(), error = %error, "state failed");
        self.reset(ctx);
        Err(error)
    }

    fn on_optional(
        &mut self,
        index: usize,
        result: Result<Progress>,
        ctx: &mut Context<'_, M>,
    ) -> Result<Progress> {
        match result {
            Ok(Progress::Pending) => Ok(Progress::Pending),
            Ok(Progress::Completed) => {
                let handler = &mut self.optional[index];
                tracing::trace!(
                    state = self.mandatory.name(),
                    handler = handler.name(),
                    "re-arming optional handler"
                );
                handler.reset(ctx);
                match handler.start(ctx) {
                    Ok(_) => Ok(Progress::Pending),
                    Err(e) => self.fail(e, ctx),
                }
            }
            Err(e) => self.fail(e, ctx),
        }
    }

    fn on_mandatory(&mut self, result: Result<Progress>, ctx: &mut Context<'_, M>) -> Result<Progress> {
        match result {
            Err(e) => self.fail(e, ctx),
            progress => progress,
        }
    }
}

impl<M: ?Sized> Handler<M> for OptionalSet<M> {
    fn name(&self) -> &'static str {
        self.mandatory.name()
    }

    fn start(&mut self, ctx: &mut Context<'_, M>) -> Result<Progress> {
        if self.started {
            return Ok(Progress::Pending);
        }
        self.started = true;

        let progress = match self.mandatory.start(ctx) {
            Ok(progress) => progress,
            Err(e) => return self.fail(e, ctx),
        };
        for index in 0..self.optional.len() {
            if let Err(e) = self.optional[index].start(ctx) {
                return self.fail(e, ctx);
            }
        }
        Ok(progress)
    }

    fn reset(&mut self, ctx: &mut Context<'_, M>) {
        self.mandatory.reset(ctx);
        for handler in &mut self.optional {
            handler.reset(ctx);
        }
        self.started = false;
    }

    fn can_send(&self, message: &Message) -> bool {
        self.optional.iter().any(|handler| handler.can_send(message))
            || self.mandatory.can_send(message)
    }

    fn send(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        if let Some(index) = self.optional.iter().position(|h| h.can_send(message)) {
            tracing::trace!(handler = self.optional[index].name(), "routing send to optional handler");
            let result = self.optional[index].send(message, ctx);
            return self.on_optional(index, result, ctx);
        }
        if self.mandatory.can_send(message) {
            let result = self.mandatory.send(message, ctx);
            return self.on_mandatory(result, ctx);
        }
        self.fail(WfdError::UnexpectedMessage(message.describe()), ctx)
    }

    fn can_handle(&self, message: &Message) -> bool {
        self.mandatory.can_handle(message)
            || self.optional.iter().any(|handler| handler.can_handle(message))
    }

    fn handle(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        if self.mandatory.can_handle(message) {
            let result = self.mandatory.handle(message, ctx);
            return self.on_mandatory(result, ctx);
        }
        if let Some(index) = self.optional.iter().position(|h| h.can_handle(message)) {
            tracing::trace!(handler = self.optional[index].name(), "routing message to optional handler");
            let result = self.optional[index].handle(message, ctx);
            return self.on_optional(index, result, ctx);
        }
        self.fail(WfdError::UnexpectedMessage(message.describe()), ctx)
    }

    fn handles_timeout(&self, id: TimerId) -> bool {
        self.mandatory.handles_timeout(id)
            || self.optional.iter().any(|handler| handler.handles_timeout(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::{Harness, answer, reply, request};
    use crate::protocol::{Method, RequestId};

    /// Mandatory: answer M8 (teardown). Optional: answer M7 and M8.
    fn streaming() -> OptionalSet<()> {
        OptionalSet::new(Sequence::new("streaming").with(answer(RequestId::M8)))
            .with_optional(answer(RequestId::M7))
            .with_optional(answer(RequestId::M8))
    }

    #[test]
    fn optional_handler_is_rearmed() {
        let mut harness = Harness::new();
        let mut set = streaming();
        set.start(&mut harness.ctx()).unwrap();

        for cseq in [2, 3] {
            let play = request(RequestId::M7, Method::Play, cseq);
            assert!(set.can_handle(&play));
            assert_eq!(set.handle(&play, &mut harness.ctx()).unwrap(), Progress::Pending);
        }
        assert_eq!(harness.outbox.len(), 2);
    }

    #[test]
    fn mandatory_wins_handle_and_completes() {
        let mut harness = Harness::new();
        let mut set = streaming();
        set.start(&mut harness.ctx()).unwrap();

        let teardown = request(RequestId::M8, Method::Teardown, 4);
        assert_eq!(
            set.handle(&teardown, &mut harness.ctx()).unwrap(),
            Progress::Completed
        );
    }

    #[test]
    fn unhandled_message_fails_whole_set() {
        let mut harness = Harness::new();
        let mut set = streaming();
        set.start(&mut harness.ctx()).unwrap();

        let stray = reply(200, 42);
        assert!(!set.can_handle(&stray));
        let err = set.handle(&stray, &mut harness.ctx()).unwrap_err();
        assert!(matches!(err, WfdError::UnexpectedMessage(_)));

        let play = request(RequestId::M7, Method::Play, 5);
        assert!(!set.can_handle(&play));
    }

    #[test]
    fn start_twice_is_a_no_op() {
        let mut harness = Harness::new();
        let mut set = streaming();
        set.start(&mut harness.ctx()).unwrap();
        set.start(&mut harness.ctx()).unwrap();
        assert_eq!(set.optional_handlers().count(), 2);
        assert!(harness.outbox.is_empty());
    }
}
