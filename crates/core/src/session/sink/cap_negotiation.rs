use super::Ctx;
use crate::error::{Result, WfdError};
use crate::handler::{Discriminator, Receiver, ReplyBuilder, Sequence};
use crate::media::SinkMediaManager;
use crate::protocol::{
    ClientRtpPorts, Property, PropertyKind, Reply, Request, RequestId, VideoFormats,
};

/// M3: report the capabilities the source asked for.
pub(super) struct M3GetParameter;

impl ReplyBuilder<dyn SinkMediaManager> for M3GetParameter {
    fn name(&self) -> &'static str {
        "M3 GET_PARAMETER"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M3)
    }

    fn build_reply(&mut self, request: &Request, ctx: &mut Ctx<'_>) -> Result<Reply> {
        let media = &*ctx.media;
        let mut reply = Reply::ok();
        for kind in request.payload.parameters() {
            let property = match kind {
                PropertyKind::VideoFormats => Property::VideoFormats(Some(VideoFormats::advertise(
                    media.native_video_format(),
                    &media.supported_video_formats(),
                ))),
                PropertyKind::AudioCodecs => Property::AudioCodecs(media.supported_audio_codecs()),
                PropertyKind::ClientRtpPorts => {
                    let (port_0, port_1) = media.local_rtp_ports();
                    Property::ClientRtpPorts(ClientRtpPorts::new(port_0, port_1))
                }
                PropertyKind::UibcCapability => Property::UibcCapability(None),
                other => {
                    tracing::trace!(step = self.name(), parameter = %other, "parameter not reported");
                    continue;
                }
            };
            reply.payload.insert(property);
        }
        Ok(reply)
    }
}

/// M4: accept the source's selections.
///
/// The first M4 must carry the presentation URL; a renegotiation during
/// Streaming may change the video format alone.
pub(super) struct M4SetParameter {
    pub(super) require_url: bool,
}

impl ReplyBuilder<dyn SinkMediaManager> for M4SetParameter {
    fn name(&self) -> &'static str {
        "M4 SET_PARAMETER"
    }

    fn discriminator(&self) -> Discriminator {
        Discriminator::request(RequestId::M4)
    }

    fn build_reply(&mut self, request: &Request, ctx: &mut Ctx<'_>) -> Result<Reply> {
        let step = self.name();
        let payload = &request.payload;

        match payload.presentation_url().and_then(|url| url.url_0.as_deref()) {
            Some(url) => ctx.media.set_presentation_url(url),
            None if self.require_url => {
                return Err(WfdError::MissingProperty {
                    step,
                    kind: PropertyKind::PresentationUrl,
                });
            }
            None => {}
        }

        if let Some(formats) = payload.video_formats() {
            let format = formats
                .selectable_formats()
                .into_iter()
                .next()
                .ok_or(WfdError::MissingProperty {
                    step,
                    kind: PropertyKind::VideoFormats,
                })?;
            if !ctx.media.set_optimal_video_format(&format) {
                return Err(WfdError::MediaRejected {
                    step,
                    what: "selected video format",
                });
            }
            tracing::debug!(step, format = ?format, "video format selected");
        }
        Ok(Reply::ok())
    }
}

pub(super) fn state() -> Sequence<dyn SinkMediaManager> {
    Sequence::new("CapabilityNegotiation")
        .with(Receiver::new(M3GetParameter))
        .with(Receiver::new(M4SetParameter { require_url: true }))
}
