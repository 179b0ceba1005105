use super::{Context, Handler, Progress};
use crate::error::Result;
use crate::protocol::Message;
use crate::transport::TimerId;

/// Ordered pipeline of child handlers with exactly one active child.
///
/// ```text
/// start ─▶ child[0] ──completed──▶ child[1] ──completed──▶ … ──▶ Completed
///              │                       │
///              └────────error──────────┴──────────────────────▶ Err
/// ```
///
/// Every operation is forwarded to the active child. A child that
/// completes is reset and the next one started; completing the last child
/// completes the sequence. An error resets the active child and ends the
/// sequence. Children are fixed once the sequence has started.
pub struct Sequence<M: ?Sized> {
    name: &'static str,
    children: Vec<Box<dyn Handler<M>>>,
    current: Option<usize>,
}

impl<M: ?Sized> Sequence<M> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            children: Vec::new(),
            current: None,
        }
    }

    /// Append a child. Panics once the sequence has started.
    pub fn push(&mut self, child: impl Handler<M> + 'static) {
        assert!(
            self.current.is_none(),
            "{}: cannot add {} after start",
            self.name,
            child.name()
        );
        self.children.push(Box::new(child));
    }

    #[must_use]
    pub fn with(mut self, child: impl Handler<M> + 'static) -> Self {
        self.push(child);
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.current.is_some()
    }

    /// Name of the active child, if the sequence is running.
    pub fn current_name(&self) -> Option<&'static str> {
        self.current.map(|index| self.children[index].name())
    }

    /// Start children from `index` on until one stays pending.
    fn enter(&mut self, mut index: usize, ctx: &mut Context<'_, M>) -> Result<Progress> {
        loop {
            let Some(child) = self.children.get_mut(index) else {
                self.current = None;
                tracing::debug!(sequence = self.name, "sequence completed");
                return Ok(Progress::Completed);
            };
            self.current = Some(index);
            tracing::debug!(sequence = self.name, state = child.name(), "entering state");

            match child.start(ctx) {
                Ok(Progress::Pending) => return Ok(Progress::Pending),
                Ok(Progress::Completed) => {
                    child.reset(ctx);
                    index += 1;
                }
                Err(e) => {
                    child.reset(ctx);
                    self.current = None;
                    return Err(e);
                }
            }
        }
    }

    fn advance(
        &mut self,
        index: usize,
        result: Result<Progress>,
        ctx: &mut Context<'_, M>,
    ) -> Result<Progress> {
        match result {
            Ok(Progress::Pending) => Ok(Progress::Pending),
            Ok(Progress::Completed) => {
                self.children[index].reset(ctx);
                self.enter(index + 1, ctx)
            }
            Err(e) => {
                tracing::debug!(
                    sequence = self.name,
                    state = self.children[index].name(),
                    error = %e,
                    "state failed"
                );
                self.children[index].reset(ctx);
                self.current = None;
                Err(e)
            }
        }
    }
}

impl<M: ?Sized> Handler<M> for Sequence<M> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&mut self, ctx: &mut Context<'_, M>) -> Result<Progress> {
        if self.current.is_some() {
            tracing::trace!(sequence = self.name, "already started");
            return Ok(Progress::Pending);
        }
        self.enter(0, ctx)
    }

    fn reset(&mut self, ctx: &mut Context<'_, M>) {
        if let Some(index) = self.current.take() {
            self.children[index].reset(ctx);
        }
    }

    fn can_send(&self, message: &Message) -> bool {
        self.current
            .is_some_and(|index| self.children[index].can_send(message))
    }

    fn send(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        assert!(
            self.can_send(message),
            "{}: send() without can_send() for {}",
            self.name,
            message.describe()
        );
        let index = self.current.unwrap_or_default();
        let result = self.children[index].send(message, ctx);
        self.advance(index, result, ctx)
    }

    fn can_handle(&self, message: &Message) -> bool {
        self.current
            .is_some_and(|index| self.children[index].can_handle(message))
    }

    fn handle(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        assert!(
            self.can_handle(message),
            "{}: handle() without can_handle() for {}",
            self.name,
            message.describe()
        );
        let index = self.current.unwrap_or_default();
        let result = self.children[index].handle(message, ctx);
        self.advance(index, result, ctx)
    }

    fn handles_timeout(&self, id: TimerId) -> bool {
        self.current
            .is_some_and(|index| self.children[index].handles_timeout(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::{Harness, answer, ping, reply, request};
    use crate::protocol::{Method, RequestId};

    fn handshake() -> Sequence<()> {
        Sequence::new("init")
            .with(ping(RequestId::M1))
            .with(answer(RequestId::M2))
    }

    #[test]
    fn advances_one_child_per_completion() {
        let mut harness = Harness::new();
        let mut sequence = handshake();

        assert_eq!(sequence.start(&mut harness.ctx()).unwrap(), Progress::Pending);
        assert_eq!(sequence.current_name(), Some("ping"));

        let ok = reply(200, 1);
        assert!(sequence.can_handle(&ok));
        assert_eq!(sequence.handle(&ok, &mut harness.ctx()).unwrap(), Progress::Pending);
        assert_eq!(sequence.current_name(), Some("answer"));

        let options = request(RequestId::M2, Method::Options, 1);
        assert_eq!(
            sequence.handle(&options, &mut harness.ctx()).unwrap(),
            Progress::Completed
        );
        assert_eq!(sequence.current_name(), None);
        assert_eq!(harness.outbox.len(), 2);
    }

    #[test]
    fn start_is_idempotent() {
        let mut harness = Harness::new();
        let mut sequence = handshake();
        sequence.start(&mut harness.ctx()).unwrap();
        sequence.start(&mut harness.ctx()).unwrap();

        assert_eq!(harness.outbox.len(), 1);
        assert_eq!(harness.cseq.peek(), 2);
        assert_eq!(sequence.current_name(), Some("ping"));
    }

    #[test]
    fn error_ends_sequence() {
        let mut harness = Harness::new();
        let mut sequence = handshake();
        sequence.start(&mut harness.ctx()).unwrap();

        assert!(sequence.handle(&reply(500, 1), &mut harness.ctx()).is_err());
        assert!(!sequence.is_started());
        assert!(harness.outbox.armed_timers().is_empty());
        assert!(!sequence.can_handle(&request(RequestId::M2, Method::Options, 1)));
    }

    #[test]
    fn reset_then_start_replays_fresh_trace() {
        let mut fresh_harness = Harness::new();
        let mut fresh = handshake();
        fresh.start(&mut fresh_harness.ctx()).unwrap();

        let mut harness = Harness::new();
        let mut sequence = handshake();
        sequence.start(&mut harness.ctx()).unwrap();
        sequence.handle(&reply(200, 1), &mut harness.ctx()).unwrap();
        sequence.reset(&mut harness.ctx());
        harness.outbox.drain();
        harness.cseq = crate::handler::CSeq::new();

        sequence.start(&mut harness.ctx()).unwrap();
        assert_eq!(sequence.current_name(), fresh.current_name());
        assert_eq!(harness.outbox.drain(), fresh_harness.outbox.drain());
    }

    #[test]
    #[should_panic(expected = "after start")]
    fn push_after_start_panics() {
        let mut harness = Harness::new();
        let mut sequence = handshake();
        sequence.start(&mut harness.ctx()).unwrap();
        sequence.push(answer(RequestId::M3));
    }
}
