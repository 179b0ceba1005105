use super::cap_negotiation::{M3GetParameter, M4SetParameter};
use super::session_setup::{M5Trigger, M7Play};
use super::{Ctx, stream_request};
use crate::error::Result;
use crate::handler::{
    Discriminator, MessageFactory, OptionalSender, OptionalSet, Receiver, ReplyBuilder,
    ReplyValidator, Sequence, SequencedSender, expect_ok,
};
use crate::media::SinkMediaManager;
use crate::protocol::{Method, Reply, Request, RequestId, TriggerMethod};

/// M8: TEARDOWN; media is released once the source acknowledges.
struct M8Teardown;

impl ReplyValidator<dyn SinkMediaManager> for M8Teardown {
    fn name(&self) -> &'static str {
        "M8 TEARDOWN"
    }

    fn validate_reply(&mut self, reply: &Reply, ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)?;
        ctx.media.teardown();
        Ok(())
    }
}

impl MessageFactory<dyn SinkMediaManager> for M8Teardown {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        stream_request(
            Method::Teardown,
            RequestId::M8,
            ctx.cseq.next(),
            &*ctx.media,
            ctx.config,
        )
    }
}

/// M9: PAUSE.
struct M9Pause;

impl ReplyValidator<dyn SinkMediaManager> for M9Pause {
    fn name(&self) -> &'static str {
        "M9 PAUSE"
    }

    fn validate_reply(&mut self, reply: &Reply, ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)?;
        ctx.media.pause();
        Ok(())
    }
}

impl MessageFactory<dyn SinkMediaManager> for M9Pause {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        stream_request(
            Method::Pause,
            RequestId::M9,
            ctx.cseq.next(),
            &*ctx.media,
            ctx.config,
        )
    }
}

/// M13: IDR picture request.
struct M13IdrRequest;

impl ReplyValidator<dyn SinkMediaManager> for M13IdrRequest {
    fn name(&self) -> &'static str {
        "M13 IDR request"
    }

    fn validate_reply(&mut self, reply: &Reply, _ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)
    }
}

/// M16: answer the source's keep-alive.
struct M16KeepAlive;

impl ReplyBuilder<dyn SinkMediaManager> for M16KeepAlive {
    fn name(&self) -> &'static str {
        "M16 keep-alive"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M16)
    }

    fn build_reply(&mut self, _request: &Request, _ctx: &mut Ctx<'_>) -> Result<Reply> {
        Ok(Reply::ok())
    }
}

/// A trigger from the source followed by the request it asks for.
fn triggered<F>(method: TriggerMethod, sender: F) -> Sequence<dyn SinkMediaManager>
where
    F: MessageFactory<dyn SinkMediaManager> + 'static,
{
    let name = match method {
        TriggerMethod::Play => "TriggeredPlay",
        TriggerMethod::Pause => "TriggeredPause",
        TriggerMethod::Teardown => "TriggeredTeardown",
        TriggerMethod::Setup => "TriggeredSetup",
    };
    Sequence::new(name)
        .with(Receiver::new(M5Trigger { method }))
        .with(SequencedSender::new(sender))
}

fn local_sender<V>(id: RequestId, validator: V) -> OptionalSender<V> {
    OptionalSender::new(Discriminator::request(id), validator)
}

pub(super) fn state() -> OptionalSet<dyn SinkMediaManager> {
    let mandatory = Sequence::new("Streaming")
        .with(Receiver::new(M5Trigger {
            method: TriggerMethod::Teardown,
        }))
        .with(SequencedSender::new(M8Teardown));

    OptionalSet::new(mandatory)
        .with_optional(triggered(TriggerMethod::Play, M7Play))
        .with_optional(triggered(TriggerMethod::Pause, M9Pause))
        .with_optional(Receiver::new(M3GetParameter))
        .with_optional(Receiver::new(M4SetParameter { require_url: false }))
        .with_optional(Receiver::new(M16KeepAlive))
        .with_optional(local_sender(RequestId::M7, M7Play))
        .with_optional(local_sender(RequestId::M8, M8Teardown))
        .with_optional(local_sender(RequestId::M9, M9Pause))
        .with_optional(local_sender(RequestId::M13, M13IdrRequest))
}
