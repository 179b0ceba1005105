use super::Ctx;
use crate::error::{Result, WfdError};
use crate::handler::{
    Discriminator, MessageFactory, Receiver, ReplyBuilder, ReplyValidator, Sequence,
    SequencedSender, expect_ok,
};
use crate::media::SinkMediaManager;
use crate::protocol::{Method, Reply, Request, RequestId};

/// Methods a source must list in its M2 reply.
const REQUIRED_SOURCE_METHODS: [Method; 6] = [
    Method::WfdExtension,
    Method::Setup,
    Method::Play,
    Method::Teardown,
    Method::GetParameter,
    Method::SetParameter,
];

/// M1: answer the source's OPTIONS.
struct M1Options;

impl ReplyBuilder<dyn SinkMediaManager> for M1Options {
    fn name(&self) -> &'static str {
        "M1 OPTIONS"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M1)
    }

    fn build_reply(&mut self, _request: &Request, _ctx: &mut Ctx<'_>) -> Result<Reply> {
        let mut reply = Reply::ok();
        reply.header.supported_methods = vec![
            Method::WfdExtension,
            Method::GetParameter,
            Method::SetParameter,
        ];
        Ok(reply)
    }
}

/// M2: our own OPTIONS, checking the source speaks WFD.
struct M2Options;

impl ReplyValidator<dyn SinkMediaManager> for M2Options {
    fn name(&self) -> &'static str {
        "M2 OPTIONS"
    }

    fn validate_reply(&mut self, reply: &Reply, _ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)?;
        let public = &reply.header.supported_methods;
        if let Some(missing) = REQUIRED_SOURCE_METHODS
            .iter()
            .find(|method| !public.contains(method))
        {
            tracing::warn!(step = self.name(), method = %missing, "source does not support method");
            return Err(WfdError::MissingHeader {
                step: self.name(),
                header: "Public",
            });
        }
        Ok(())
    }
}

impl MessageFactory<dyn SinkMediaManager> for M2Options {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        let mut request = Request::options()
            .with_id(RequestId::M2)
            .with_cseq(ctx.cseq.next());
        request.header.require_wfd_support = true;
        request
    }
}

pub(super) fn state() -> Sequence<dyn SinkMediaManager> {
    Sequence::new("Init")
        .with(Receiver::new(M1Options))
        .with(SequencedSender::new(M2Options))
}
