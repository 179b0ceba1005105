use super::Ctx;
use super::session_setup::{M5Trigger, M7Play, M8Teardown};
use crate::error::Result;
use crate::handler::{
    Discriminator, OptionalSender, OptionalSet, Receiver, ReplyBuilder, ReplyValidator, Sequence,
    expect_ok,
};
use crate::media::SourceMediaManager;
use crate::protocol::{Reply, Request, RequestId, TriggerMethod};

/// M9: PAUSE from the sink.
struct M9Pause;

impl ReplyBuilder<dyn SourceMediaManager> for M9Pause {
    fn name(&self) -> &'static str {
        "M9 PAUSE"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M9)
    }

    fn build_reply(&mut self, _request: &Request, ctx: &mut Ctx<'_>) -> Result<Reply> {
        ctx.media.pause();
        Ok(Reply::ok())
    }
}

/// M13: the sink lost sync and asks for an IDR picture.
struct M13IdrRequest;

impl ReplyBuilder<dyn SourceMediaManager> for M13IdrRequest {
    fn name(&self) -> &'static str {
        "M13 IDR request"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M13)
    }

    fn build_reply(&mut self, _request: &Request, ctx: &mut Ctx<'_>) -> Result<Reply> {
        ctx.media.send_idr_picture();
        Ok(Reply::ok())
    }
}

/// M16: empty GET_PARAMETER keep-alive.
struct M16KeepAlive;

impl ReplyValidator<dyn SourceMediaManager> for M16KeepAlive {
    fn name(&self) -> &'static str {
        "M16 keep-alive"
    }

    fn validate_reply(&mut self, reply: &Reply, _ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)
    }
}

fn trigger_sender(method: TriggerMethod) -> OptionalSender<M5Trigger> {
    OptionalSender::new(Discriminator::trigger(method), M5Trigger { method })
}

pub(super) fn state() -> OptionalSet<dyn SourceMediaManager> {
    OptionalSet::new(Sequence::new("Streaming").with(Receiver::new(M8Teardown)))
        .with_optional(Receiver::new(M7Play {
            require_paused: false,
        }))
        .with_optional(Receiver::new(M9Pause))
        .with_optional(Receiver::new(M13IdrRequest))
        .with_optional(trigger_sender(TriggerMethod::Play))
        .with_optional(trigger_sender(TriggerMethod::Pause))
        .with_optional(trigger_sender(TriggerMethod::Teardown))
        .with_optional(OptionalSender::new(
            Discriminator::request(RequestId::M16),
            M16KeepAlive,
        ))
}
