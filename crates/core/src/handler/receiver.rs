use super::{Context, Handler, Progress, ReplyBuilder};
use crate::error::Result;
use crate::protocol::Message;

/// Leaf handler that answers exactly one inbound request per activation.
///
/// Armed by `start`, disarmed by `reset` or by handling its request.
/// Receivers never initiate, so `can_send` is always `false`.
pub struct Receiver<R> {
    builder: R,
    armed: bool,
}

impl<R> Receiver<R> {
    pub fn new(builder: R) -> Self {
        Self {
            builder,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl<M: ?Sized, R: ReplyBuilder<M>> Handler<M> for Receiver<R> {
    fn name(&self) -> &'static str {
        self.builder.name()
    }

    fn start(&mut self, _ctx: &mut Context<'_, M>) -> Result<Progress> {
        self.armed = true;
        Ok(Progress::Pending)
    }

    fn reset(&mut self, _ctx: &mut Context<'_, M>) {
        self.armed = false;
    }

    fn can_send(&self, _message: &Message) -> bool {
        false
    }

    fn send(&mut self, message: &Message, _ctx: &mut Context<'_, M>) -> Result<Progress> {
        panic!(
            "{}: receivers never send ({})",
            self.builder.name(),
            message.describe()
        );
    }

    fn can_handle(&self, message: &Message) -> bool {
        self.armed
            && message
                .as_request()
                .is_some_and(|request| self.builder.accepts(request))
    }

    fn handle(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress> {
        assert!(
            self.can_handle(message),
            "{}: handle() without can_handle() for {}",
            self.builder.name(),
            message.describe()
        );
        self.armed = false;

        let Some(request) = message.as_request() else {
            unreachable!("can_handle accepts requests only");
        };
        let reply = self
            .builder
            .build_reply(request, ctx)?
            .with_cseq(request.cseq());

        tracing::debug!(
            step = self.builder.name(),
            cseq = request.cseq(),
            code = reply.response_code(),
            "reply sent"
        );
        ctx.transport.send_rtsp_data(&reply.to_string());
        Ok(Progress::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::{Answer, Harness, answer, request};
    use crate::protocol::{Method, RequestId};

    #[test]
    fn answers_only_when_armed() {
        let mut harness = Harness::new();
        let mut receiver = answer(RequestId::M2);
        let options = request(RequestId::M2, Method::Options, 4);

        assert!(!Handler::<()>::can_handle(&receiver, &options));
        receiver.start(&mut harness.ctx()).unwrap();
        assert!(Handler::<()>::can_handle(&receiver, &options));
        assert!(!Handler::<()>::can_handle(&receiver, &request(RequestId::M6, Method::Setup, 4)));
        assert!(!Handler::<()>::can_send(&receiver, &options));

        let progress = receiver.handle(&options, &mut harness.ctx()).unwrap();
        assert_eq!(progress, Progress::Completed);
        assert!(!receiver.is_armed());

        let sent = harness.outbox.drain();
        assert_eq!(sent, vec!["RTSP/1.0 200 OK\r\nCSeq: 4\r\n\r\n".to_string()]);
    }

    #[test]
    fn build_failure_sends_nothing() {
        let mut harness = Harness::new();
        let mut receiver = Receiver::new(Answer {
            id: RequestId::M7,
            fail: true,
        });
        receiver.start(&mut harness.ctx()).unwrap();

        let play = request(RequestId::M7, Method::Play, 9);
        assert!(receiver.handle(&play, &mut harness.ctx()).is_err());
        assert!(harness.outbox.is_empty());
        assert!(!receiver.is_armed());
    }

    #[test]
    #[should_panic(expected = "without can_handle")]
    fn handle_when_disarmed_panics() {
        let mut harness = Harness::new();
        let mut receiver = answer(RequestId::M2);
        let _ = receiver.handle(&request(RequestId::M2, Method::Options, 1), &mut harness.ctx());
    }
}
