//! Sink role: the display that receives the stream.
//!
//! The sink mostly answers: it replies to M1, M3, M4 and the M5 triggers,
//! and issues SETUP, PLAY, PAUSE and TEARDOWN when triggered or when the
//! user asks for them.

mod cap_negotiation;
mod init;
mod session_setup;
mod streaming;

use crate::error::{Result, WfdError};
use crate::handler::{Context, Sequence};
use crate::media::SinkMediaManager;
use crate::protocol::{Method, Property, PropertyKind, Request, RequestId};
use crate::transport::Transport;

use super::{Engine, SessionConfig};

/// Sink side of a WFD session.
pub type Sink = Engine<dyn SinkMediaManager>;

type Ctx<'a> = Context<'a, dyn SinkMediaManager>;

impl Engine<dyn SinkMediaManager> {
    pub fn new(media: Box<dyn SinkMediaManager>, transport: Box<dyn Transport>) -> Self {
        Self::with_config(media, transport, SessionConfig::default())
    }

    pub fn with_config(
        media: Box<dyn SinkMediaManager>,
        transport: Box<dyn Transport>,
        config: SessionConfig,
    ) -> Self {
        let machine = Sequence::new("sink")
            .with(init::state())
            .with(cap_negotiation::state())
            .with(session_setup::state())
            .with(streaming::state());
        Engine::assemble("sink", machine, media, transport, config, identify)
    }

    /// Resume playback (M7).
    pub fn play(&mut self) -> Result<()> {
        self.send_command("play", |cseq, media, config| {
            stream_request(Method::Play, RequestId::M7, cseq, media, config)
        })
    }

    /// Pause playback (M9).
    pub fn pause(&mut self) -> Result<()> {
        self.send_command("pause", |cseq, media, config| {
            stream_request(Method::Pause, RequestId::M9, cseq, media, config)
        })
    }

    /// End the session from the sink side (M8).
    ///
    /// The source completes its session when it answers. This engine tears
    /// its media down on the reply and stays in Streaming until the host
    /// resets it.
    pub fn teardown(&mut self) -> Result<()> {
        self.send_command("teardown", |cseq, media, config| {
            stream_request(Method::Teardown, RequestId::M8, cseq, media, config)
        })
    }

    /// Ask the source for an IDR picture (M13).
    pub fn request_idr(&mut self) -> Result<()> {
        self.send_command("idr-request", |cseq, media, config| {
            let mut request = Request::new(Method::SetParameter, &config.request_uri)
                .with_id(RequestId::M13)
                .with_cseq(cseq)
                .with_property(Property::IdrRequest);
            if let Some(session) = media.session_id() {
                request = request.with_session(session);
            }
            request
        })
    }
}

/// A request on the presentation URL, carrying the session id once known.
fn stream_request(
    method: Method,
    id: RequestId,
    cseq: u32,
    media: &dyn SinkMediaManager,
    config: &SessionConfig,
) -> Request {
    let uri = media.presentation_url().unwrap_or(&config.request_uri);
    let request = Request::new(method, uri).with_id(id).with_cseq(cseq);
    match media.session_id() {
        Some(session) => request.with_session(session),
        None => request,
    }
}

/// Step ids of requests a sink receives.
fn identify(request: &mut Request) -> Result<()> {
    let id = match request.method() {
        Method::Options => RequestId::M1,
        Method::GetParameter if request.payload.is_empty() => RequestId::M16,
        Method::GetParameter => RequestId::M3,
        Method::SetParameter if request.payload.has(PropertyKind::TriggerMethod) => RequestId::M5,
        Method::SetParameter => RequestId::M4,
        method => {
            return Err(WfdError::UnidentifiedRequest {
                method,
                cseq: request.cseq(),
            });
        }
    };
    request.set_id(id);
    Ok(())
}
