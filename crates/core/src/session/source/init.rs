use super::Ctx;
use crate::error::Result;
use crate::handler::{
    Discriminator, MessageFactory, Receiver, ReplyBuilder, ReplyValidator, Sequence,
    SequencedSender, expect_ok,
};
use crate::media::SourceMediaManager;
use crate::protocol::{Method, Reply, Request, RequestId};

/// M1: `OPTIONS *` with `Require: org.wfa.wfd1.0`.
struct M1Options;

impl ReplyValidator<dyn SourceMediaManager> for M1Options {
    fn name(&self) -> &'static str {
        "M1 OPTIONS"
    }

    fn validate_reply(&mut self, reply: &Reply, _ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)
    }
}

impl MessageFactory<dyn SourceMediaManager> for M1Options {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        let mut request = Request::options()
            .with_id(RequestId::M1)
            .with_cseq(ctx.cseq.next());
        request.header.require_wfd_support = true;
        request
    }
}

/// M2: answer the sink's OPTIONS with the methods a source accepts.
struct M2Options;

impl ReplyBuilder<dyn SourceMediaManager> for M2Options {
    fn name(&self) -> &'static str {
        "M2 OPTIONS"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M2)
    }

    fn build_reply(&mut self, _request: &Request, _ctx: &mut Ctx<'_>) -> Result<Reply> {
        let mut reply = Reply::ok();
        reply.header.supported_methods = vec![
            Method::WfdExtension,
            Method::GetParameter,
            Method::SetParameter,
            Method::Play,
            Method::Pause,
            Method::Setup,
            Method::Teardown,
        ];
        Ok(reply)
    }
}

pub(super) fn state() -> Sequence<dyn SourceMediaManager> {
    Sequence::new("Init")
        .with(SequencedSender::new(M1Options))
        .with(Receiver::new(M2Options))
}
