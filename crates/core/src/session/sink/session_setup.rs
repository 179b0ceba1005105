use super::{Ctx, stream_request};
use crate::error::{Result, WfdError};
use crate::handler::{
    Discriminator, MessageFactory, Receiver, ReplyBuilder, ReplyValidator, Sequence,
    SequencedSender, expect_ok,
};
use crate::media::SinkMediaManager;
use crate::protocol::{Method, Reply, Request, RequestId, TransportHeader, TriggerMethod};

/// M5: acknowledge a trigger from the source. The request it asks for is
/// sent by the step that follows.
pub(super) struct M5Trigger {
    pub(super) method: TriggerMethod,
}

impl ReplyBuilder<dyn SinkMediaManager> for M5Trigger {
    fn name(&self) -> &'static str {
        match self.method {
            TriggerMethod::Setup => "M5 SETUP trigger",
            TriggerMethod::Play => "M5 PLAY trigger",
            TriggerMethod::Pause => "M5 PAUSE trigger",
            TriggerMethod::Teardown => "M5 TEARDOWN trigger",
        }
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::trigger(self.method)
    }

    fn build_reply(&mut self, _request: &Request, _ctx: &mut Ctx<'_>) -> Result<Reply> {
        Ok(Reply::ok())
    }
}

/// M6: SETUP on the presentation URL; the reply assigns the session id.
struct M6Setup;

impl ReplyValidator<dyn SinkMediaManager> for M6Setup {
    fn name(&self) -> &'static str {
        "M6 SETUP"
    }

    fn validate_reply(&mut self, reply: &Reply, ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)?;
        let session = reply
            .header
            .session
            .as_deref()
            .filter(|session| !session.is_empty())
            .ok_or(WfdError::MissingHeader {
                step: self.name(),
                header: "Session",
            })?;
        tracing::debug!(
            step = self.name(),
            session_id = session,
            server_rtp_port = reply.header.transport.as_ref().and_then(|t| t.server_rtp_port),
            "session established"
        );
        ctx.media.set_session_id(session);
        Ok(())
    }
}

impl MessageFactory<dyn SinkMediaManager> for M6Setup {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        let (rtp_port, _) = ctx.media.local_rtp_ports();
        let mut request = stream_request(
            Method::Setup,
            RequestId::M6,
            ctx.cseq.next(),
            &*ctx.media,
            ctx.config,
        );
        request.header.transport = Some(TransportHeader::new(rtp_port));
        request
    }
}

/// M7: PLAY; playback starts once the source agrees.
pub(super) struct M7Play;

impl ReplyValidator<dyn SinkMediaManager> for M7Play {
    fn name(&self) -> &'static str {
        "M7 PLAY"
    }

    fn validate_reply(&mut self, reply: &Reply, ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)?;
        ctx.media.play();
        Ok(())
    }
}

impl MessageFactory<dyn SinkMediaManager> for M7Play {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        stream_request(
            Method::Play,
            RequestId::M7,
            ctx.cseq.next(),
            &*ctx.media,
            ctx.config,
        )
    }
}

pub(super) fn state() -> Sequence<dyn SinkMediaManager> {
    Sequence::new("SessionSetup")
        .with(Receiver::new(M5Trigger {
            method: TriggerMethod::Setup,
        }))
        .with(SequencedSender::new(M6Setup))
        .with(SequencedSender::new(M7Play))
}
