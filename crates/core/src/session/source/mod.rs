//! Source role: the device that streams media to the sink.
//!
//! The source drives the session. It opens with M1, queries and commits
//! capabilities (M3/M4), triggers SETUP (M5) and then answers the sink's
//! SETUP/PLAY/PAUSE/TEARDOWN requests.

mod cap_negotiation;
mod init;
mod session_setup;
mod streaming;

use crate::error::{Result, WfdError};
use crate::handler::{Context, Sequence};
use crate::media::SourceMediaManager;
use crate::protocol::{Method, PropertyKind, Request, RequestId, TriggerMethod};
use crate::transport::Transport;

use super::{Engine, SessionConfig};

/// Source side of a WFD session.
pub type Source = Engine<dyn SourceMediaManager>;

type Ctx<'a> = Context<'a, dyn SourceMediaManager>;

impl Engine<dyn SourceMediaManager> {
    pub fn new(media: Box<dyn SourceMediaManager>, transport: Box<dyn Transport>) -> Self {
        Self::with_config(media, transport, SessionConfig::default())
    }

    pub fn with_config(
        media: Box<dyn SourceMediaManager>,
        transport: Box<dyn Transport>,
        config: SessionConfig,
    ) -> Self {
        let machine = Sequence::new("source")
            .with(init::state())
            .with(cap_negotiation::state())
            .with(session_setup::state())
            .with(streaming::state());
        Engine::assemble("source", machine, media, transport, config, identify)
    }

    /// Ask the sink to resume playback (M5 `PLAY` trigger).
    pub fn play(&mut self) -> Result<()> {
        self.trigger("play", TriggerMethod::Play)
    }

    /// Ask the sink to pause playback (M5 `PAUSE` trigger).
    pub fn pause(&mut self) -> Result<()> {
        self.trigger("pause", TriggerMethod::Pause)
    }

    /// Ask the sink to end the session (M5 `TEARDOWN` trigger).
    pub fn teardown(&mut self) -> Result<()> {
        self.trigger("teardown", TriggerMethod::Teardown)
    }

    /// Send an empty GET_PARAMETER (M16) to keep the session alive.
    pub fn send_keep_alive(&mut self) -> Result<()> {
        self.send_command("keep-alive", |cseq, _, config| {
            Request::new(Method::GetParameter, &config.request_uri)
                .with_id(RequestId::M16)
                .with_cseq(cseq)
        })
    }

    fn trigger(&mut self, command: &'static str, method: TriggerMethod) -> Result<()> {
        self.send_command(command, |cseq, _, config| {
            Request::trigger(method, &config.request_uri, cseq)
        })
    }
}

/// Step ids of requests a source receives.
fn identify(request: &mut Request) -> Result<()> {
    let id = match request.method() {
        Method::Options => RequestId::M2,
        Method::Setup => RequestId::M6,
        Method::Play => RequestId::M7,
        Method::Teardown => RequestId::M8,
        Method::Pause => RequestId::M9,
        Method::SetParameter => {
            let payload = &request.payload;
            [
                (PropertyKind::Route, RequestId::M10),
                (PropertyKind::ConnectorType, RequestId::M11),
                (PropertyKind::Standby, RequestId::M12),
                (PropertyKind::IdrRequest, RequestId::M13),
                (PropertyKind::UibcCapability, RequestId::M14),
                (PropertyKind::UibcSetting, RequestId::M15),
            ]
            .into_iter()
            .find(|(kind, _)| payload.has(*kind))
            .map(|(_, id)| id)
            .ok_or_else(|| unidentified(request))?
        }
        _ => return Err(unidentified(request)),
    };
    request.set_id(id);
    Ok(())
}

fn unidentified(request: &Request) -> WfdError {
    WfdError::UnidentifiedRequest {
        method: request.method(),
        cseq: request.cseq(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Property;

    #[test]
    fn set_parameter_is_identified_by_property() {
        let mut idr = Request::new(Method::SetParameter, "rtsp://localhost/wfd1.0")
            .with_property(Property::IdrRequest);
        identify(&mut idr).unwrap();
        assert_eq!(idr.id(), Some(RequestId::M13));

        let mut standby = Request::new(Method::SetParameter, "rtsp://localhost/wfd1.0")
            .with_property(Property::Standby);
        identify(&mut standby).unwrap();
        assert_eq!(standby.id(), Some(RequestId::M12));
    }

    #[test]
    fn unknown_requests_are_rejected() {
        let mut empty = Request::new(Method::SetParameter, "rtsp://localhost/wfd1.0").with_cseq(3);
        assert!(matches!(
            identify(&mut empty),
            Err(WfdError::UnidentifiedRequest { cseq: 3, .. })
        ));

        let mut get = Request::new(Method::GetParameter, "rtsp://localhost/wfd1.0");
        assert!(identify(&mut get).is_err());
    }

    #[test]
    fn setup_maps_to_m6() {
        let mut setup = Request::new(Method::Setup, "rtsp://10.0.0.1/wfd1.0/streamid=0");
        identify(&mut setup).unwrap();
        assert_eq!(setup.id(), Some(RequestId::M6));
    }
}
