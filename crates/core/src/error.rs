//! Error types for the Wi-Fi Display session engine.

use std::fmt;

use crate::protocol::{Method, PropertyKind};
use crate::transport::TimerId;

/// Errors that can occur while driving a WFD session.
///
/// Variants map to the failure classes of the protocol engine:
///
/// - **Protocol violation**: [`UnexpectedMessage`](Self::UnexpectedMessage),
///   [`UnidentifiedRequest`](Self::UnidentifiedRequest),
///   [`ReplyTimeout`](Self::ReplyTimeout). The peer sent something no
///   armed handler accepts, or never answered.
/// - **Negotiation failure**: [`ResponseCode`](Self::ResponseCode),
///   [`MissingProperty`](Self::MissingProperty),
///   [`MissingHeader`](Self::MissingHeader),
///   [`MediaRejected`](Self::MediaRejected).
/// - **Engine**: [`CommandRejected`](Self::CommandRejected),
///   [`NotRunning`](Self::NotRunning).
/// - **Codec**: [`Parse`](Self::Parse), for malformed message text.
///
/// None of these is retried inside the engine. Recovery is the host's
/// `reset()` / `start()` pair.
#[derive(Debug, thiserror::Error)]
pub enum WfdError {
    /// No armed handler accepts this message in the current state.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    /// The receiving role has no step id for this request.
    #[error("cannot identify {method} request (cseq {cseq})")]
    UnidentifiedRequest { method: Method, cseq: u32 },

    /// The peer answered with a non-success status code.
    #[error("{step}: peer replied {code}")]
    ResponseCode { step: &'static str, code: u16 },

    /// A reply or request lacked a property the step needs.
    #[error("{step}: missing property {kind}")]
    MissingProperty {
        step: &'static str,
        kind: PropertyKind,
    },

    /// A reply or request lacked a header the step needs.
    #[error("{step}: missing {header} header")]
    MissingHeader {
        step: &'static str,
        header: &'static str,
    },

    /// The media manager refused a negotiated value or action.
    #[error("{step}: media manager rejected {what}")]
    MediaRejected {
        step: &'static str,
        what: &'static str,
    },

    /// A local command could not be sent in the current state.
    #[error("{0} cannot be sent in the current session state")]
    CommandRejected(&'static str),

    /// The engine has not been started, or already finished.
    #[error("session engine is not running")]
    NotRunning,

    /// A reply timer armed by a sender fired.
    #[error("no reply before timer {0} fired")]
    ReplyTimeout(TimerId),

    /// Failed to parse a message from its text form.
    #[error("parse error: {kind}")]
    Parse { kind: ParseErrorKind },
}

impl WfdError {
    pub(crate) fn parse(kind: ParseErrorKind) -> Self {
        Self::Parse { kind }
    }
}

/// Specific kind of message parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input was empty (no start line).
    EmptyMessage,
    /// The start line was neither `Method URI RTSP/1.0` nor `RTSP/1.0 Code Reason`.
    InvalidStartLine,
    /// The request method is not part of the WFD method set.
    UnknownMethod(String),
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// The `CSeq` header was absent or not a number.
    InvalidCseq,
    /// A `Transport` header value could not be parsed.
    InvalidTransport,
    /// A known property had a malformed value.
    InvalidProperty(&'static str),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::InvalidStartLine => write!(f, "invalid start line"),
            Self::UnknownMethod(method) => write!(f, "unknown method {method}"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidCseq => write!(f, "missing or invalid CSeq"),
            Self::InvalidTransport => write!(f, "invalid Transport header"),
            Self::InvalidProperty(name) => write!(f, "invalid value for {name}"),
        }
    }
}

/// Convenience alias for `Result<T, WfdError>`.
pub type Result<T> = std::result::Result<T, WfdError>;
