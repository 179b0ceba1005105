use rand::RngExt;

use super::Ctx;
use crate::error::{Result, WfdError};
use crate::handler::{
    Discriminator, MessageFactory, OptionalSet, Receiver, ReplyBuilder, ReplyValidator, Sequence,
    SequencedSender, expect_ok,
};
use crate::media::SourceMediaManager;
use crate::protocol::{Reply, Request, RequestId, TriggerMethod};

/// M5: `SET_PARAMETER wfd_trigger_method: <method>`.
///
/// Sent once by SessionSetup for SETUP, and from local commands during
/// Streaming for the other methods.
pub(super) struct M5Trigger {
    pub(super) method: TriggerMethod,
}

impl ReplyValidator<dyn SourceMediaManager> for M5Trigger {
    fn name(&self) -> &'static str {
        match self.method {
            TriggerMethod::Setup => "M5 SETUP trigger",
            TriggerMethod::Play => "M5 PLAY trigger",
            TriggerMethod::Pause => "M5 PAUSE trigger",
            TriggerMethod::Teardown => "M5 TEARDOWN trigger",
        }
    }

    fn validate_reply(&mut self, reply: &Reply, _ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)
    }
}

impl MessageFactory<dyn SourceMediaManager> for M5Trigger {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        Request::trigger(self.method, &ctx.config.request_uri, ctx.cseq.next())
    }
}

/// M6: answer SETUP with a fresh session id and the server RTP port.
struct M6Setup;

impl ReplyBuilder<dyn SourceMediaManager> for M6Setup {
    fn name(&self) -> &'static str {
        "M6 SETUP"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M6)
    }

    fn build_reply(&mut self, request: &Request, ctx: &mut Ctx<'_>) -> Result<Reply> {
        let transport = request
            .header
            .transport
            .clone()
            .ok_or(WfdError::MissingHeader {
                step: self.name(),
                header: "Transport",
            })?;
        let rtp_port = ctx.media.local_rtp_port();
        let session_id = format!("{:016X}", rand::rng().random::<u64>());
        tracing::debug!(
            step = self.name(),
            session_id = %session_id,
            client_rtp_port = transport.client_rtp_port,
            server_rtp_port = rtp_port,
            "session created"
        );

        let mut reply = Reply::ok().with_session(&session_id);
        reply.header.timeout = Some(ctx.config.session_timeout_secs);
        reply.header.transport =
            Some(transport.with_server_ports(rtp_port, rtp_port.checked_add(1)));
        Ok(reply)
    }
}

/// M7: PLAY from the sink.
///
/// During SessionSetup the stream must still be paused; during Streaming a
/// PLAY of a running stream is acknowledged without side effects.
pub(super) struct M7Play {
    pub(super) require_paused: bool,
}

impl ReplyBuilder<dyn SourceMediaManager> for M7Play {
    fn name(&self) -> &'static str {
        "M7 PLAY"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M7)
    }

    fn build_reply(&mut self, _request: &Request, ctx: &mut Ctx<'_>) -> Result<Reply> {
        if ctx.media.is_paused() {
            ctx.media.play();
        } else if self.require_paused {
            return Err(WfdError::MediaRejected {
                step: self.name(),
                what: "PLAY of a running stream",
            });
        }
        Ok(Reply::ok())
    }
}

/// M8: TEARDOWN from the sink.
pub(super) struct M8Teardown;

impl ReplyBuilder<dyn SourceMediaManager> for M8Teardown {
    fn name(&self) -> &'static str {
        "M8 TEARDOWN"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M8)
    }

    fn build_reply(&mut self, _request: &Request, ctx: &mut Ctx<'_>) -> Result<Reply> {
        ctx.media.teardown();
        Ok(Reply::ok())
    }
}

pub(super) fn state() -> OptionalSet<dyn SourceMediaManager> {
    let mandatory = Sequence::new("SessionSetup")
        .with(SequencedSender::new(M5Trigger {
            method: TriggerMethod::Setup,
        }))
        .with(Receiver::new(M6Setup))
        .with(Receiver::new(M7Play {
            require_paused: true,
        }));
    OptionalSet::new(mandatory).with_optional(Receiver::new(M8Teardown))
}
