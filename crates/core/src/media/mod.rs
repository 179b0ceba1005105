//! Media manager collaborators.
//!
//! The session engine negotiates *what* to stream; a media manager owns
//! the pipeline that actually streams it. Each role consumes its own
//! extension of [`MediaManager`]:
//!
//! | Trait | Role | Extra duties |
//! |-------|------|--------------|
//! | [`SourceMediaManager`] | source (sender of media) | sink RTP ports, format selection, IDR pictures |
//! | [`SinkMediaManager`] | sink (display) | presentation URL, session id, advertised formats |
//!
//! Calls come from inside `Engine::handle_message` and the command
//! methods, synchronously and on the engine's thread.

use crate::protocol::{AudioCodec, H264VideoFormat, NativeVideoFormat};

/// Playback control shared by both roles.
pub trait MediaManager {
    fn play(&mut self);
    fn pause(&mut self);
    fn teardown(&mut self);
    fn is_paused(&self) -> bool;
}

/// Media side of a WFD source.
pub trait SourceMediaManager: MediaManager {
    /// Store the RTP ports the sink listens on (`wfd_client_rtp_ports`).
    fn set_sink_rtp_ports(&mut self, port_0: u16, port_1: u16);
    fn sink_rtp_ports(&self) -> (u16, u16);

    /// Local port RTP is sent from, advertised as `server_port`.
    fn local_rtp_port(&self) -> u16;

    /// H.264 formats this source can encode.
    fn selectable_video_formats(&self) -> Vec<H264VideoFormat>;

    /// Choose the streaming format given the sink's native format and the
    /// formats it can decode. Returns `false` when nothing fits.
    ///
    /// Implementations usually call
    /// [`find_optimal_video_format`](crate::protocol::find_optimal_video_format).
    fn init_optimal_video_format(
        &mut self,
        sink_native: &NativeVideoFormat,
        sink_formats: &[H264VideoFormat],
    ) -> bool;
    fn optimal_video_format(&self) -> H264VideoFormat;

    /// Choose the audio codec from the sink's list. Returns `false` when
    /// no codec is shared.
    fn init_optimal_audio_codec(&mut self, sink_codecs: &[AudioCodec]) -> bool;
    fn optimal_audio_codec(&self) -> AudioCodec;

    /// Emit an IDR picture on the sink's request (M13).
    fn send_idr_picture(&mut self);
}

/// Media side of a WFD sink.
pub trait SinkMediaManager: MediaManager {
    /// RTP ports advertised in `wfd_client_rtp_ports`. The second port is
    /// 0 when the sink has a single receiver.
    fn local_rtp_ports(&self) -> (u16, u16);

    fn set_presentation_url(&mut self, url: &str);
    fn presentation_url(&self) -> Option<&str>;

    fn set_session_id(&mut self, session: &str);
    fn session_id(&self) -> Option<&str>;

    fn supported_video_formats(&self) -> Vec<H264VideoFormat>;
    fn native_video_format(&self) -> NativeVideoFormat;
    fn supported_audio_codecs(&self) -> Vec<AudioCodec>;

    /// Accept the format the source selected in M4. Returns `false` to
    /// reject it.
    fn set_optimal_video_format(&mut self, format: &H264VideoFormat) -> bool;
}
