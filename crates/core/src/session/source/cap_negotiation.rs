use super::Ctx;
use crate::error::{Result, WfdError};
use crate::handler::{MessageFactory, ReplyValidator, Sequence, SequencedSender, expect_ok};
use crate::media::SourceMediaManager;
use crate::protocol::{
    ClientRtpPorts, Method, Payload, PresentationUrl, Property, PropertyKind, Reply, Request,
    RequestId, VideoFormats,
};

/// M3: query the sink's formats and RTP ports.
struct M3GetParameter;

const QUERIED: [PropertyKind; 3] = [
    PropertyKind::VideoFormats,
    PropertyKind::AudioCodecs,
    PropertyKind::ClientRtpPorts,
];

impl ReplyValidator<dyn SourceMediaManager> for M3GetParameter {
    fn name(&self) -> &'static str {
        "M3 GET_PARAMETER"
    }

    fn validate_reply(&mut self, reply: &Reply, ctx: &mut Ctx<'_>) -> Result<()> {
        let step = self.name();
        expect_ok(step, reply)?;
        let payload = &reply.payload;
        let missing = |kind| WfdError::MissingProperty { step, kind };

        let ports = payload
            .client_rtp_ports()
            .ok_or(missing(PropertyKind::ClientRtpPorts))?;
        ctx.media.set_sink_rtp_ports(ports.rtp_port_0, ports.rtp_port_1);

        let formats = payload
            .video_formats()
            .ok_or(missing(PropertyKind::VideoFormats))?;
        if !ctx
            .media
            .init_optimal_video_format(&formats.native, &formats.selectable_formats())
        {
            return Err(WfdError::MediaRejected {
                step,
                what: "sink video formats",
            });
        }

        let codecs = payload
            .audio_codecs()
            .ok_or(missing(PropertyKind::AudioCodecs))?;
        if !ctx.media.init_optimal_audio_codec(codecs) {
            return Err(WfdError::MediaRejected {
                step,
                what: "sink audio codecs",
            });
        }

        tracing::debug!(
            step,
            rtp_port = ports.rtp_port_0,
            video = ?ctx.media.optimal_video_format(),
            audio = %ctx.media.optimal_audio_codec(),
            "sink capabilities accepted"
        );
        Ok(())
    }
}

impl MessageFactory<dyn SourceMediaManager> for M3GetParameter {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        Request::new(Method::GetParameter, &ctx.config.request_uri)
            .with_id(RequestId::M3)
            .with_cseq(ctx.cseq.next())
            .with_payload(Payload::with_parameters(&QUERIED))
    }
}

/// M4: commit the selected formats and announce the presentation URL.
struct M4SetParameter;

impl ReplyValidator<dyn SourceMediaManager> for M4SetParameter {
    fn name(&self) -> &'static str {
        "M4 SET_PARAMETER"
    }

    fn validate_reply(&mut self, reply: &Reply, _ctx: &mut Ctx<'_>) -> Result<()> {
        expect_ok(self.name(), reply)
    }
}

impl MessageFactory<dyn SourceMediaManager> for M4SetParameter {
    fn create_message(&mut self, ctx: &mut Ctx<'_>) -> Request {
        let (port_0, port_1) = ctx.media.sink_rtp_ports();
        let url = format!(
            "rtsp://{}{}",
            ctx.transport.local_ip_address(),
            ctx.config.stream_path
        );
        Request::new(Method::SetParameter, &ctx.config.request_uri)
            .with_id(RequestId::M4)
            .with_cseq(ctx.cseq.next())
            .with_property(Property::ClientRtpPorts(ClientRtpPorts::new(port_0, port_1)))
            .with_property(Property::PresentationUrl(PresentationUrl::primary(&url)))
            .with_property(Property::VideoFormats(Some(VideoFormats::selected(
                &ctx.media.optimal_video_format(),
            ))))
            .with_property(Property::AudioCodecs(vec![ctx.media.optimal_audio_codec()]))
    }
}

pub(super) fn state() -> Sequence<dyn SourceMediaManager> {
    Sequence::new("CapabilityNegotiation")
        .with(SequencedSender::new(M3GetParameter))
        .with(SequencedSender::new(M4SetParameter))
}
