use std::fmt;

use super::message::Header;
use super::payload::{Payload, Property, TriggerMethod};

/// RTSP methods used by Wi-Fi Display (WFD §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    SetParameter,
    GetParameter,
    Setup,
    Play,
    Teardown,
    Pause,
    /// The `org.wfa.wfd1.0` extension token. Only appears in the `Public`
    /// and `Require` headers, never as a request method.
    WfdExtension,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::SetParameter => "SET_PARAMETER",
            Self::GetParameter => "GET_PARAMETER",
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Teardown => "TEARDOWN",
            Self::Pause => "PAUSE",
            Self::WfdExtension => "org.wfa.wfd1.0",
        }
    }

    /// Parse a method token as it appears on a request line or in `Public`.
    pub fn from_token(token: &str) -> Option<Self> {
        let method = match token.trim() {
            "OPTIONS" => Self::Options,
            "SET_PARAMETER" => Self::SetParameter,
            "GET_PARAMETER" => Self::GetParameter,
            "SETUP" => Self::Setup,
            "PLAY" => Self::Play,
            "TEARDOWN" => Self::Teardown,
            "PAUSE" => Self::Pause,
            "org.wfa.wfd1.0" => Self::WfdExtension,
            _ => return None,
        };
        Some(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WFD protocol step a request represents (WFD §6.4).
///
/// | Id | Direction | Request |
/// |----|-----------|---------|
/// | M1 | source → sink | OPTIONS |
/// | M2 | sink → source | OPTIONS |
/// | M3 | source → sink | GET_PARAMETER (capabilities) |
/// | M4 | source → sink | SET_PARAMETER (selected formats) |
/// | M5 | source → sink | SET_PARAMETER `wfd_trigger_method` |
/// | M6 | sink → source | SETUP |
/// | M7 | sink → source | PLAY |
/// | M8 | sink → source | TEARDOWN |
/// | M9 | sink → source | PAUSE |
/// | M10 | sink → source | SET_PARAMETER `wfd_route` |
/// | M11 | sink → source | SET_PARAMETER `wfd_connector_type` |
/// | M12 | sink → source | SET_PARAMETER `wfd_standby` |
/// | M13 | sink → source | SET_PARAMETER `wfd_idr_request` |
/// | M14 | either | SET_PARAMETER `wfd_uibc_capability` |
/// | M15 | either | SET_PARAMETER `wfd_uibc_setting` |
/// | M16 | source → sink | GET_PARAMETER (keep-alive) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestId {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
    M8,
    M9,
    M10,
    M11,
    M12,
    M13,
    M14,
    M15,
    M16,
}

/// A WFD request: a step id, a method, a request URI, header and payload.
///
/// The step id is set by whoever knows it: the handler that builds an
/// outbound request, or the receiving engine for an inbound one (the
/// codec cannot tell M3 from M16 without knowing the role).
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Request {
    id: Option<RequestId>,
    method: Method,
    uri: String,
    pub header: Header,
    pub payload: Payload,
}

impl Request {
    pub fn new(method: Method, uri: &str) -> Self {
        Request {
            id: None,
            method,
            uri: uri.to_string(),
            header: Header::default(),
            payload: Payload::default(),
        }
    }

    pub fn options() -> Self {
        Self::new(Method::Options, "*")
    }

    /// SET_PARAMETER carrying `wfd_trigger_method` (M5).
    pub fn trigger(method: TriggerMethod, uri: &str, cseq: u32) -> Self {
        Self::new(Method::SetParameter, uri)
            .with_id(RequestId::M5)
            .with_cseq(cseq)
            .with_property(Property::TriggerMethod(method))
    }

    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_cseq(mut self, cseq: u32) -> Self {
        self.header.cseq = cseq;
        self
    }

    pub fn with_session(mut self, session: &str) -> Self {
        self.header.session = Some(session.to_string());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.payload.insert(property);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn id(&self) -> Option<RequestId> {
        self.id
    }

    pub fn set_id(&mut self, id: RequestId) {
        self.id = Some(id);
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn cseq(&self) -> u32 {
        self.header.cseq
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} RTSP/1.0\r\n", self.method, self.uri)?;
        self.header.write(f)?;
        super::message::write_body(f, &self.payload)
    }
}
