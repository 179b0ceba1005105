use std::fmt;

use super::payload::Payload;
use super::request::{Method, Request};
use super::response::Reply;
use super::transport::TransportHeader;
use crate::error::{ParseErrorKind, Result, WfdError};

/// Header fields the WFD control protocol uses.
///
/// Serialized in a fixed order: `CSeq`, `Session`, `Public`, `Require`,
/// `Transport`. Body headers (`Content-Type`, `Content-Length`) are
/// derived from the payload when the message is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    /// Sequence number pairing a request with its reply (RFC 2326 §12.17).
    pub cseq: u32,
    /// Session identifier assigned by the source in the SETUP reply.
    pub session: Option<String>,
    /// Session timeout in seconds, written as `;timeout=` after the id.
    pub timeout: Option<u64>,
    /// Methods listed in a `Public` header (OPTIONS replies).
    pub supported_methods: Vec<Method>,
    /// Set when the message carries `Require: org.wfa.wfd1.0`.
    pub require_wfd_support: bool,
    pub transport: Option<TransportHeader>,
}

impl Header {
    /// Format the `Session` header value per RFC 2326 §12.37.
    ///
    /// Example: `"0000000000000001;timeout=60"`
    pub fn session_header_value(&self) -> Option<String> {
        self.session.as_ref().map(|id| match self.timeout {
            Some(timeout) => format!("{id};timeout={timeout}"),
            None => id.clone(),
        })
    }

    pub(crate) fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSeq: {}\r\n", self.cseq)?;
        if let Some(session) = self.session_header_value() {
            write!(f, "Session: {session}\r\n")?;
        }
        if !self.supported_methods.is_empty() {
            let methods: Vec<&str> = self.supported_methods.iter().map(Method::as_str).collect();
            write!(f, "Public: {}\r\n", methods.join(", "))?;
        }
        if self.require_wfd_support {
            write!(f, "Require: {}\r\n", Method::WfdExtension)?;
        }
        if let Some(transport) = &self.transport {
            write!(f, "Transport: {transport}\r\n")?;
        }
        Ok(())
    }

    fn apply(&mut self, name: &str, value: &str) -> Result<()> {
        if name.eq_ignore_ascii_case("CSeq") {
            self.cseq = value
                .parse()
                .map_err(|_| WfdError::parse(ParseErrorKind::InvalidCseq))?;
        } else if name.eq_ignore_ascii_case("Session") {
            let mut parts = value.split(';');
            self.session = parts.next().map(|id| id.trim().to_string());
            self.timeout = parts
                .filter_map(|p| p.trim().strip_prefix("timeout="))
                .find_map(|t| t.parse().ok());
        } else if name.eq_ignore_ascii_case("Public") {
            self.supported_methods = value
                .split(',')
                .filter_map(|token| {
                    let method = Method::from_token(token);
                    if method.is_none() {
                        tracing::trace!(token, "ignoring unknown Public method");
                    }
                    method
                })
                .collect();
        } else if name.eq_ignore_ascii_case("Require") {
            self.require_wfd_support = value
                .split(',')
                .any(|token| Method::from_token(token) == Some(Method::WfdExtension));
        } else if name.eq_ignore_ascii_case("Transport") {
            let transport = TransportHeader::parse(value)
                .ok_or(WfdError::parse(ParseErrorKind::InvalidTransport))?;
            self.transport = Some(transport);
        } else if !name.eq_ignore_ascii_case("Content-Type")
            && !name.eq_ignore_ascii_case("Content-Length")
        {
            tracing::trace!(name, value, "ignoring header");
        }
        Ok(())
    }
}

pub(crate) fn write_body(f: &mut fmt::Formatter<'_>, payload: &Payload) -> fmt::Result {
    if payload.is_empty() {
        return f.write_str("\r\n");
    }
    let body = payload.to_string();
    write!(
        f,
        "Content-Type: text/parameters\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

/// One unit of the WFD control protocol: a request or a reply.
///
/// `to_string()` yields the exact wire text. [`Message::parse`] is the
/// inverse for one complete message; splitting a byte stream into
/// messages is the transport's job.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Reply(Reply),
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply(_))
    }

    pub fn cseq(&self) -> u32 {
        self.header().cseq
    }

    pub fn header(&self) -> &Header {
        match self {
            Self::Request(request) => &request.header,
            Self::Reply(reply) => &reply.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut Header {
        match self {
            Self::Request(request) => &mut request.header,
            Self::Reply(reply) => &mut reply.header,
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Self::Request(request) => &request.payload,
            Self::Reply(reply) => &reply.payload,
        }
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        match self {
            Self::Request(request) => &mut request.payload,
            Self::Reply(reply) => &mut reply.payload,
        }
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Self::Request(request) => Some(request),
            Self::Reply(_) => None,
        }
    }

    pub fn as_reply(&self) -> Option<&Reply> {
        match self {
            Self::Reply(reply) => Some(reply),
            Self::Request(_) => None,
        }
    }

    /// Short description for logs and errors, e.g. `SETUP request (cseq 4)`.
    pub fn describe(&self) -> String {
        match self {
            Self::Request(request) => {
                format!("{} request (cseq {})", request.method(), request.cseq())
            }
            Self::Reply(reply) => {
                format!("{} reply (cseq {})", reply.response_code(), reply.cseq())
            }
        }
    }

    /// Parse one complete message from its text representation.
    ///
    /// Expects a start line, headers, a blank line and an optional body of
    /// property lines. Returns [`WfdError::Parse`] on malformed input.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut lines = raw.lines();

        let start_line = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or(WfdError::parse(ParseErrorKind::EmptyMessage))?;

        let parts: Vec<&str> = start_line.split_whitespace().collect();

        let mut header = Header::default();
        let mut saw_cseq = false;
        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let colon_pos = line
                .find(':')
                .ok_or(WfdError::parse(ParseErrorKind::InvalidHeader))?;
            let name = line[..colon_pos].trim();
            let value = line[colon_pos + 1..].trim();
            saw_cseq |= name.eq_ignore_ascii_case("CSeq");
            header.apply(name, value)?;
        }
        if !saw_cseq {
            return Err(WfdError::parse(ParseErrorKind::InvalidCseq));
        }

        let payload = Payload::parse_lines(lines)?;

        if parts.first() == Some(&"RTSP/1.0") {
            let code = parts
                .get(1)
                .and_then(|c| c.parse::<u16>().ok())
                .ok_or(WfdError::parse(ParseErrorKind::InvalidStartLine))?;
            let mut reply = Reply::new(code);
            reply.header = header;
            reply.payload = payload;
            return Ok(Self::Reply(reply));
        }

        if parts.len() != 3 {
            return Err(WfdError::parse(ParseErrorKind::InvalidStartLine));
        }
        if parts[2] != "RTSP/1.0" {
            tracing::warn!(version = parts[2], "peer sent non-RTSP/1.0 version");
        }
        let method = match Method::from_token(parts[0]) {
            Some(Method::WfdExtension) | None => {
                return Err(WfdError::parse(ParseErrorKind::UnknownMethod(
                    parts[0].to_string(),
                )));
            }
            Some(method) => method,
        };

        let mut request = Request::new(method, parts[1]);
        request.header = header;
        request.payload = payload;
        Ok(Self::Request(request))
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Reply> for Message {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(request) => request.fmt(f),
            Self::Reply(reply) => reply.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientRtpPorts, Property, PropertyKind, TriggerMethod};

    #[test]
    fn parse_options_request() {
        let raw = "OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nRequire: org.wfa.wfd1.0\r\n\r\n";
        let msg = Message::parse(raw).unwrap();
        let req = msg.as_request().unwrap();
        assert_eq!(req.method(), Method::Options);
        assert_eq!(req.uri(), "*");
        assert_eq!(req.cseq(), 1);
        assert!(req.header.require_wfd_support);
        assert_eq!(req.id(), None);
    }

    #[test]
    fn parse_reply_with_public_and_session() {
        let raw = "RTSP/1.0 200 OK\r\n\
                   CSeq: 4\r\n\
                   Session: 6B8B4567;timeout=30\r\n\
                   Public: org.wfa.wfd1.0, SETUP, TEARDOWN, DESCRIBE\r\n\r\n";
        let msg = Message::parse(raw).unwrap();
        let reply = msg.as_reply().unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.cseq(), 4);
        assert_eq!(reply.header.session.as_deref(), Some("6B8B4567"));
        assert_eq!(reply.header.timeout, Some(30));
        assert_eq!(
            reply.header.supported_methods,
            vec![Method::WfdExtension, Method::Setup, Method::Teardown]
        );
    }

    #[test]
    fn parse_get_parameter_names() {
        let raw = "GET_PARAMETER rtsp://localhost/wfd1.0 RTSP/1.0\r\n\
                   CSeq: 2\r\n\
                   Content-Type: text/parameters\r\n\
                   Content-Length: 57\r\n\r\n\
                   wfd_video_formats\r\nwfd_audio_codecs\r\nwfd_client_rtp_ports\r\n";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(
            msg.payload().parameters(),
            &[
                PropertyKind::VideoFormats,
                PropertyKind::AudioCodecs,
                PropertyKind::ClientRtpPorts
            ]
        );
        assert!(msg.payload().properties().next().is_none());
    }

    #[test]
    fn parse_reply_properties() {
        let raw = "RTSP/1.0 200 OK\r\nCSeq: 2\r\n\r\n\
                   wfd_client_rtp_ports: RTP/AVP/UDP;unicast 19000 0 mode=play\r\n\
                   wfd_some_vendor_extension: 42\r\n";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(
            msg.payload().client_rtp_ports(),
            Some(&ClientRtpPorts::new(19000, 0))
        );
    }

    #[test]
    fn serialize_then_parse_preserves_trigger() {
        let text = Request::trigger(TriggerMethod::Teardown, "rtsp://localhost/wfd1.0", 9)
            .to_string();
        let msg = Message::parse(&text).unwrap();
        assert_eq!(
            msg.payload().get(PropertyKind::TriggerMethod),
            Some(&Property::TriggerMethod(TriggerMethod::Teardown))
        );
        assert_eq!(msg.to_string(), text);
    }

    #[test]
    fn parse_errors() {
        assert!(Message::parse("").is_err());
        assert!(Message::parse("JUST_A_METHOD\r\n\r\n").is_err());
        assert!(Message::parse("DESCRIBE rtsp://x RTSP/1.0\r\nCSeq: 1\r\n\r\n").is_err());
        assert!(Message::parse("OPTIONS * RTSP/1.0\r\n\r\n").is_err());
        assert!(Message::parse("OPTIONS * RTSP/1.0\r\nCSeq one\r\n\r\n").is_err());
        assert!(Message::parse("RTSP/1.0 OK\r\nCSeq: 1\r\n\r\n").is_err());
    }

    #[test]
    fn header_lookup_case_insensitive() {
        let msg = Message::parse("OPTIONS * RTSP/1.0\r\ncseq: 42\r\n\r\n").unwrap();
        assert_eq!(msg.cseq(), 42);
    }
}
