use std::fmt;

use super::message::Header;
use super::payload::{Payload, Property};

/// 200 OK, success (RFC 2326 §7.1.1).
pub const RTSP_OK: u16 = 200;
pub const RTSP_BAD_REQUEST: u16 = 400;
pub const RTSP_NOT_FOUND: u16 = 404;
pub const RTSP_SESSION_NOT_FOUND: u16 = 454;
pub const RTSP_UNSUPPORTED_TRANSPORT: u16 = 461;
pub const RTSP_INTERNAL_ERROR: u16 = 500;
pub const RTSP_NOT_IMPLEMENTED: u16 = 501;

/// Reason phrase for a status code (RFC 2326 §7.1.1).
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        303 => "See Other",
        400 => "Bad Request",
        404 => "Not Found",
        406 => "Not Acceptable",
        454 => "Session Not Found",
        457 => "Invalid Range",
        461 => "Unsupported Transport",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        551 => "Option not supported",
        _ => "Unknown",
    }
}

/// A WFD reply (RFC 2326 §7).
///
/// Serializes to:
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 3\r\n
/// Content-Type: text/parameters\r\n
/// Content-Length: 42\r\n
/// \r\n
/// wfd_client_rtp_ports: RTP/AVP/UDP;unicast 19000 0 mode=play\r\n
/// ```
///
/// The cseq is normally stamped by the receiver that sends the reply,
/// copied from the request it answers.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Reply {
    response_code: u16,
    pub header: Header,
    pub payload: Payload,
}

impl Reply {
    pub fn new(response_code: u16) -> Self {
        Reply {
            response_code,
            header: Header::default(),
            payload: Payload::default(),
        }
    }

    pub fn ok() -> Self {
        Self::new(RTSP_OK)
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

    pub fn response_code(&self) -> u16 {
        self.response_code
    }

    pub fn is_ok(&self) -> bool {
        self.response_code == RTSP_OK
    }

    pub fn cseq(&self) -> u32 {
        self.header.cseq
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RTSP/1.0 {} {}\r\n",
            self.response_code,
            reason_phrase(self.response_code)
        )?;
        self.header.write(f)?;
        super::message::write_body(f, &self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Method;

    #[test]
    fn serialize_no_body() {
        let mut reply = Reply::ok().with_cseq(1);
        reply.header.supported_methods = vec![
            Method::WfdExtension,
            Method::GetParameter,
            Method::SetParameter,
        ];
        assert_eq!(
            reply.to_string(),
            "RTSP/1.0 200 OK\r\nCSeq: 1\r\nPublic: org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER\r\n\r\n"
        );
    }

    #[test]
    fn serialize_session_with_timeout() {
        let mut reply = Reply::ok().with_cseq(4).with_session("00AB");
        reply.header.timeout = Some(60);
        let text = reply.to_string();
        assert!(text.contains("Session: 00AB;timeout=60\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn error_status_line() {
        let reply = Reply::new(RTSP_SESSION_NOT_FOUND).with_cseq(5);
        assert!(!reply.is_ok());
        assert!(reply.to_string().starts_with("RTSP/1.0 454 Session Not Found\r\n"));
    }
}
