//! WFD session engines (WFD §6.1).
//!
//! A session walks both peers through the same four protocol states:
//!
//! ```text
//! Init                  M1/M2   OPTIONS handshake
//! CapabilityNegotiation M3/M4   GET_PARAMETER query, SET_PARAMETER commit
//! SessionSetup          M5–M7   SETUP trigger, SETUP, PLAY
//! Streaming             M5–M16  play / pause / teardown / IDR / keep-alive
//! ```
//!
//! [`Source`] and [`Sink`] are the two roles of [`Engine`]. Each owns its
//! handler tree, the session's `CSeq` counter, its media manager and its
//! transport. The host drives an engine through three entry points:
//! inbound messages, local commands and timer events.

pub mod engine;
pub mod sink;
pub mod source;

use std::time::Duration;

pub use engine::Engine;
pub use sink::Sink;
pub use source::Source;

/// Default session timeout in seconds (RFC 2326 §12.37).
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 60;

/// Engine-level configuration shared by every handler of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Request URI of control requests that do not address the stream.
    pub request_uri: String,
    /// Path of the stream on the source, appended to its local address to
    /// form the presentation URL.
    pub stream_path: String,
    /// Timeout advertised in the `Session` header of the SETUP reply.
    pub session_timeout_secs: u64,
    /// How long a sender waits for a reply before the session is reset.
    pub reply_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_uri: "rtsp://localhost/wfd1.0".to_string(),
            stream_path: "/wfd1.0/streamid=0".to_string(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            reply_timeout: Duration::from_secs(5),
        }
    }
}

/// Lifecycle of an engine, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed or reset, not started.
    Idle,
    /// Started; the handler tree is waiting for messages.
    Running,
    /// The session was torn down normally.
    Completed,
    /// A protocol error or reply timeout reset the handler tree.
    Failed,
}
