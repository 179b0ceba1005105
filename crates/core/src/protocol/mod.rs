//! WFD message model (WFD §6).
//!
//! This module holds the text-based control protocol units that the
//! session engine consumes and emits: requests, replies, their headers
//! and the WFD parameter payload.
//!
//! ## Message format
//!
//! WFD messages follow RTSP/1.0 syntax with a `text/parameters` body:
//!
//! ```text
//! SET_PARAMETER rtsp://localhost/wfd1.0 RTSP/1.0\r\n
//! CSeq: 5\r\n
//! Content-Type: text/parameters\r\n
//! Content-Length: 27\r\n
//! \r\n
//! wfd_trigger_method: SETUP\r\n
//! ```
//!
//! Key differences from plain RTSP:
//! - Both ends send requests; the source initiates most of them.
//! - Capabilities travel as `wfd_*` parameters in GET/SET_PARAMETER bodies.
//! - Requests are known by their step number (M1–M16), see [`RequestId`].
//!
//! ## Supported parameters
//!
//! | Parameter | Type |
//! |-----------|------|
//! | `wfd_video_formats` | [`VideoFormats`] |
//! | `wfd_audio_codecs` | [`AudioCodec`] list |
//! | `wfd_client_rtp_ports` | [`ClientRtpPorts`] |
//! | `wfd_presentation_URL` | [`PresentationUrl`] |
//! | `wfd_trigger_method` | [`TriggerMethod`] |
//! | `wfd_uibc_capability` | [`UibcCapability`] |
//! | `wfd_idr_request`, `wfd_standby` | flags |
//! | `wfd_uibc_setting`, `wfd_route`, `wfd_connector_type` | scalars |

pub mod audio_codec;
pub mod message;
pub mod payload;
pub mod request;
pub mod response;
pub mod transport;
pub mod video_format;

pub use audio_codec::{AudioCodec, AudioFormat, find_optimal_audio_codec};
pub use message::{Header, Message};
pub use payload::{
    AudioRoute, ClientRtpPorts, GenericInput, InputCategory, Payload, PresentationUrl, Property,
    PropertyKind, TriggerMethod, UibcCapability,
};
pub use request::{Method, Request, RequestId};
pub use response::{RTSP_OK, Reply};
pub use transport::TransportHeader;
pub use video_format::{
    H264Codec, H264Level, H264Profile, H264VideoFormat, NativeVideoFormat, ResolutionType,
    VideoFormats, find_optimal_video_format,
};
