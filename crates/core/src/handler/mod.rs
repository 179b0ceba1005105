//! Message handler tree.
//!
//! Every protocol state and step is a [`Handler`]. Leaves know one
//! message exchange, composites arrange leaves into protocol states:
//!
//! | Type | Kind | Behaviour |
//! |------|------|-----------|
//! | [`Receiver`] | leaf | answers one inbound request |
//! | [`SequencedSender`] | leaf | sends one request on start, validates its reply |
//! | [`OptionalSender`] | leaf | forwards locally built requests, validates replies |
//! | [`Sequence`] | composite | runs children one after another |
//! | [`OptionalSet`] | composite | a [`Sequence`] plus handlers armed for its whole lifetime |
//!
//! ## Contract
//!
//! `send` must only be called after `can_send` returned `true` for the
//! same message, and `handle` only after `can_handle` did. Breaking this
//! is a bug in the caller and panics.
//!
//! Operations report their outcome through [`Progress`]:
//!
//! ```text
//! Ok(Progress::Pending)    still waiting for more messages
//! Ok(Progress::Completed)  unit of work done, the parent advances
//! Err(e)                   protocol or negotiation failure, the parent fails
//! ```

pub mod optional_set;
pub mod receiver;
pub mod sender;
pub mod sequence;

use crate::error::Result;
use crate::protocol::{Message, Reply, Request, RequestId, TriggerMethod};
use crate::session::SessionConfig;
use crate::transport::{TimerId, Transport};

pub use optional_set::OptionalSet;
pub use receiver::Receiver;
pub use sender::{OptionalSender, SequencedSender};
pub use sequence::Sequence;

/// Outcome of a successful handler operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Completed,
}

/// Per-session `CSeq` counter shared by every sender of one engine.
///
/// Starts at 1 and is never rewound, not even by a reset, so a late reply
/// from before a reset can never match a fresh request.
#[derive(Debug, Clone)]
pub struct CSeq(u32);

impl CSeq {
    pub fn new() -> Self {
        CSeq(1)
    }

    /// Take the next sequence number.
    pub fn next(&mut self) -> u32 {
        let cseq = self.0;
        self.0 = self.0.checked_add(1).unwrap_or(1);
        cseq
    }

    /// The value the next call to [`next`](Self::next) returns.
    pub fn peek(&self) -> u32 {
        self.0
    }
}

impl Default for CSeq {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a handler may touch besides itself.
///
/// The engine builds one per entry point from its own fields and passes
/// it down the tree.
pub struct Context<'a, M: ?Sized> {
    pub cseq: &'a mut CSeq,
    pub media: &'a mut M,
    pub transport: &'a mut dyn Transport,
    pub config: &'a SessionConfig,
}

/// A node of the handler tree.
pub trait Handler<M: ?Sized> {
    /// Name used in logs and for [`current_state`](crate::session::Engine::current_state).
    fn name(&self) -> &'static str;

    /// Arm the handler. Senders of an unconditional request transmit it here.
    fn start(&mut self, ctx: &mut Context<'_, M>) -> Result<Progress>;

    /// Disarm and drop all in-flight state. Never fails.
    fn reset(&mut self, ctx: &mut Context<'_, M>);

    fn can_send(&self, message: &Message) -> bool;
    fn send(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress>;

    fn can_handle(&self, message: &Message) -> bool;
    fn handle(&mut self, message: &Message, ctx: &mut Context<'_, M>) -> Result<Progress>;

    /// Whether `id` is a reply timer this handler is waiting on.
    fn handles_timeout(&self, id: TimerId) -> bool {
        let _ = id;
        false
    }
}

/// Identity of a request a step accepts: its step id and, for M5, the
/// trigger method it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discriminator {
    pub id: RequestId,
    pub trigger: Option<TriggerMethod>,
}

impl Discriminator {
    pub const fn request(id: RequestId) -> Self {
        Self { id, trigger: None }
    }

    /// An M5 `SET_PARAMETER` carrying `wfd_trigger_method: <method>`.
    pub const fn trigger(method: TriggerMethod) -> Self {
        Self {
            id: RequestId::M5,
            trigger: Some(method),
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        request.id() == Some(self.id)
            && (self.trigger.is_none() || request.payload.trigger_method() == self.trigger)
    }
}

/// The step-specific half of a [`Receiver`].
pub trait ReplyBuilder<M: ?Sized> {
    fn name(&self) -> &'static str;

    fn discriminator(&self) -> Discriminator;

    fn accepts(&self, request: &Request) -> bool {
        self.discriminator().matches(request)
    }

    /// Build the reply to `request`, or fail the step. The `CSeq` header
    /// is filled in by the receiver.
    fn build_reply(&mut self, request: &Request, ctx: &mut Context<'_, M>) -> Result<Reply>;
}

/// The step-specific half of a sender: checks a reply and extracts the
/// negotiated values into the media manager.
pub trait ReplyValidator<M: ?Sized> {
    fn name(&self) -> &'static str;

    fn validate_reply(&mut self, reply: &Reply, ctx: &mut Context<'_, M>) -> Result<()>;
}

/// A sender step that builds its own request when started.
pub trait MessageFactory<M: ?Sized>: ReplyValidator<M> {
    /// Build the request, taking its `CSeq` from `ctx.cseq`.
    fn create_message(&mut self, ctx: &mut Context<'_, M>) -> Request;
}

/// Check a reply's status code in a validator.
pub(crate) fn expect_ok(step: &'static str, reply: &Reply) -> Result<()> {
    if reply.is_ok() {
        Ok(())
    } else {
        Err(crate::error::WfdError::ResponseCode {
            step,
            code: reply.response_code(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal steps and a context harness for handler unit tests.

    use super::*;
    use crate::error::WfdError;
    use crate::protocol::Method;
    use crate::transport::Outbox;

    pub(crate) struct Harness {
        pub cseq: CSeq,
        pub media: (),
        pub outbox: Outbox,
        transport: Outbox,
        pub config: SessionConfig,
    }

    impl Harness {
        pub fn new() -> Self {
            let outbox = Outbox::new("10.0.0.1");
            Self {
                cseq: CSeq::new(),
                media: (),
                transport: outbox.clone(),
                outbox,
                config: SessionConfig::default(),
            }
        }

        pub fn ctx(&mut self) -> Context<'_, ()> {
            Context {
                cseq: &mut self.cseq,
                media: &mut self.media,
                transport: &mut self.transport,
                config: &self.config,
            }
        }
    }

    /// Answers `id` with `200 OK`, or with an error when `fail` is set.
    pub(crate) struct Answer {
        pub id: RequestId,
        pub fail: bool,
    }

    impl ReplyBuilder<()> for Answer {
        fn name(&self) -> &'static str {
            "answer"
        }

        fn discriminator(&self) -> Discriminator {
            Discriminator::request(self.id)
        }

        fn build_reply(&mut self, _request: &Request, _ctx: &mut Context<'_, ()>) -> Result<Reply> {
            if self.fail {
                return Err(WfdError::MediaRejected {
                    step: "answer",
                    what: "request",
                });
            }
            Ok(Reply::ok())
        }
    }

    pub(crate) fn answer(id: RequestId) -> Receiver<Answer> {
        Receiver::new(Answer { id, fail: false })
    }

    /// Sends an OPTIONS request tagged `id` and expects `200 OK`.
    pub(crate) struct Ping {
        pub id: RequestId,
    }

    impl ReplyValidator<()> for Ping {
        fn name(&self) -> &'static str {
            "ping"
        }

        fn validate_reply(&mut self, reply: &Reply, _ctx: &mut Context<'_, ()>) -> Result<()> {
            expect_ok("ping", reply)
        }
    }

    impl MessageFactory<()> for Ping {
        fn create_message(&mut self, ctx: &mut Context<'_, ()>) -> Request {
            Request::options().with_id(self.id).with_cseq(ctx.cseq.next())
        }
    }

    pub(crate) fn ping(id: RequestId) -> SequencedSender<Ping> {
        SequencedSender::new(Ping { id })
    }

    pub(crate) fn request(id: RequestId, method: Method, cseq: u32) -> Message {
        Message::Request(Request::new(method, "rtsp://localhost/wfd1.0").with_id(id).with_cseq(cseq))
    }

    pub(crate) fn reply(code: u16, cseq: u32) -> Message {
        Message::Reply(Reply::new(code).with_cseq(cseq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Method, Property};

    #[test]
    fn cseq_counts_from_one() {
        let mut cseq = CSeq::new();
        assert_eq!(cseq.next(), 1);
        assert_eq!(cseq.next(), 2);
        assert_eq!(cseq.peek(), 3);
    }

    #[test]
    fn trigger_discriminator_checks_method() {
        let pause = Discriminator::trigger(TriggerMethod::Pause);
        let request = Request::trigger(TriggerMethod::Pause, "rtsp://localhost/wfd1.0", 7);
        assert!(pause.matches(&request));
        assert!(!Discriminator::trigger(TriggerMethod::Play).matches(&request));
        assert!(Discriminator::request(RequestId::M5).matches(&request));

        let untagged = Request::new(Method::SetParameter, "rtsp://localhost/wfd1.0")
            .with_property(Property::TriggerMethod(TriggerMethod::Pause));
        assert!(!pause.matches(&untagged));
    }
}
