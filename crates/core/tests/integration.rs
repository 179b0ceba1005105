use std::sync::Arc;

use parking_lot::Mutex;
use wfd::protocol::{
    AudioCodec, AudioFormat, H264Level, H264Profile, H264VideoFormat, NativeVideoFormat,
    ResolutionType, find_optimal_audio_codec, find_optimal_video_format,
};
use wfd::{
    MediaManager, Outbox, SessionState, Sink, SinkMediaManager, Source, SourceMediaManager,
    WfdError,
};

type Calls = Arc<Mutex<Vec<&'static str>>>;

fn formats() -> Vec<H264VideoFormat> {
    [0, 5, 7]
        .into_iter()
        .map(|index| {
            H264VideoFormat::new(
                H264Profile::ConstrainedBaseline,
                H264Level::L3_1,
                ResolutionType::Cea,
                index,
            )
        })
        .collect()
}

struct Encoder {
    calls: Calls,
    paused: bool,
    sink_ports: (u16, u16),
    video: Option<H264VideoFormat>,
    audio: Option<AudioCodec>,
}

impl Encoder {
    fn new(calls: Calls) -> Self {
        Self {
            calls,
            paused: true,
            sink_ports: (0, 0),
            video: None,
            audio: None,
        }
    }
}

impl MediaManager for Encoder {
    fn play(&mut self) {
        self.paused = false;
        self.calls.lock().push("play");
    }

    fn pause(&mut self) {
        self.paused = true;
        self.calls.lock().push("pause");
    }

    fn teardown(&mut self) {
        self.calls.lock().push("teardown");
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

impl SourceMediaManager for Encoder {
    fn set_sink_rtp_ports(&mut self, port_0: u16, port_1: u16) {
        self.sink_ports = (port_0, port_1);
    }

    fn sink_rtp_ports(&self) -> (u16, u16) {
        self.sink_ports
    }

    fn local_rtp_port(&self) -> u16 {
        16384
    }

    fn selectable_video_formats(&self) -> Vec<H264VideoFormat> {
        formats()
    }

    fn init_optimal_video_format(
        &mut self,
        sink_native: &NativeVideoFormat,
        sink_formats: &[H264VideoFormat],
    ) -> bool {
        self.video = find_optimal_video_format(sink_native, &formats(), sink_formats);
        self.video.is_some()
    }

    fn optimal_video_format(&self) -> H264VideoFormat {
        self.video.unwrap()
    }

    fn init_optimal_audio_codec(&mut self, sink_codecs: &[AudioCodec]) -> bool {
        self.audio = find_optimal_audio_codec(&[AudioCodec::new(AudioFormat::Lpcm, 0x3)], sink_codecs);
        self.audio.is_some()
    }

    fn optimal_audio_codec(&self) -> AudioCodec {
        self.audio.unwrap()
    }

    fn send_idr_picture(&mut self) {
        self.calls.lock().push("idr");
    }
}

struct Display {
    calls: Calls,
    paused: bool,
    url: Option<String>,
    session: Option<String>,
    format: Arc<Mutex<Option<H264VideoFormat>>>,
}

impl Display {
    fn new(calls: Calls) -> Self {
        Self {
            calls,
            paused: true,
            url: None,
            session: None,
            format: Arc::default(),
        }
    }
}

impl MediaManager for Display {
    fn play(&mut self) {
        self.paused = false;
        self.calls.lock().push("play");
    }

    fn pause(&mut self) {
        self.paused = true;
        self.calls.lock().push("pause");
    }

    fn teardown(&mut self) {
        self.calls.lock().push("teardown");
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

impl SinkMediaManager for Display {
    fn local_rtp_ports(&self) -> (u16, u16) {
        (19000, 0)
    }

    fn set_presentation_url(&mut self, url: &str) {
        self.url = Some(url.to_string());
    }

    fn presentation_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn set_session_id(&mut self, session: &str) {
        self.session = Some(session.to_string());
    }

    fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn supported_video_formats(&self) -> Vec<H264VideoFormat> {
        formats()
    }

    fn native_video_format(&self) -> NativeVideoFormat {
        // 1280x720p60
        NativeVideoFormat::new(ResolutionType::Cea, 6)
    }

    fn supported_audio_codecs(&self) -> Vec<AudioCodec> {
        vec![AudioCodec::new(AudioFormat::Lpcm, 0x1)]
    }

    fn set_optimal_video_format(&mut self, format: &H264VideoFormat) -> bool {
        *self.format.lock() = Some(*format);
        true
    }
}

struct Link {
    source: Source,
    sink: Sink,
    source_out: Outbox,
    sink_out: Outbox,
    source_calls: Calls,
    sink_calls: Calls,
    sink_format: Arc<Mutex<Option<H264VideoFormat>>>,
}

impl Link {
    fn new() -> Self {
        let source_out = Outbox::new("192.168.49.1");
        let sink_out = Outbox::new("192.168.49.10");
        let source_calls = Calls::default();
        let sink_calls = Calls::default();
        let display = Display::new(sink_calls.clone());
        let sink_format = display.format.clone();
        Self {
            source: Source::new(
                Box::new(Encoder::new(source_calls.clone())),
                Box::new(source_out.clone()),
            ),
            sink: Sink::new(Box::new(display), Box::new(sink_out.clone())),
            source_out,
            sink_out,
            source_calls,
            sink_calls,
            sink_format,
        }
    }

    /// Deliver queued messages in both directions until neither side has
    /// anything left to say.
    fn pump(&mut self) -> wfd::Result<()> {
        loop {
            let mut idle = true;
            if let Some(text) = self.source_out.pop() {
                idle = false;
                self.sink.handle_data(&text)?;
            }
            if let Some(text) = self.sink_out.pop() {
                idle = false;
                self.source.handle_data(&text)?;
            }
            if idle {
                return Ok(());
            }
        }
    }

    fn establish() -> Self {
        let mut link = Self::new();
        link.sink.start().unwrap();
        link.source.start().unwrap();
        link.pump().unwrap();
        assert_eq!(link.source.current_state(), Some("Streaming"));
        assert_eq!(link.sink.current_state(), Some("Streaming"));
        link
    }
}

fn ok_reply(cseq: u32) -> String {
    format!("RTSP/1.0 200 OK\r\nCSeq: {cseq}\r\n\r\n")
}

fn start_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[test]
fn source_opens_with_options_then_queries_capabilities() {
    let outbox = Outbox::default();
    let mut source = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    source.start().unwrap();

    let m1 = outbox.pop().unwrap();
    assert!(m1.starts_with("OPTIONS * RTSP/1.0\r\n"), "{m1}");
    assert!(m1.contains("CSeq: 1\r\n"));
    assert!(m1.contains("Require: org.wfa.wfd1.0\r\n"));
    assert_eq!(source.current_state(), Some("Init"));

    source.handle_data(&ok_reply(1)).unwrap();
    assert!(outbox.is_empty());

    source
        .handle_data("OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nRequire: org.wfa.wfd1.0\r\n\r\n")
        .unwrap();
    let m2_reply = outbox.pop().unwrap();
    assert!(m2_reply.starts_with("RTSP/1.0 200 OK\r\n"), "{m2_reply}");
    assert!(m2_reply.contains("Public: org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER"));

    let m3 = outbox.pop().unwrap();
    assert!(m3.starts_with("GET_PARAMETER rtsp://localhost/wfd1.0 RTSP/1.0\r\n"), "{m3}");
    assert!(m3.contains("CSeq: 2\r\n"));
    assert!(m3.contains("wfd_client_rtp_ports"));
    assert_eq!(source.current_state(), Some("CapabilityNegotiation"));
    assert_eq!(source.state(), SessionState::Running);
}

#[test]
fn capability_reply_without_client_ports_fails_the_session() {
    let outbox = Outbox::default();
    let mut source = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    source.start().unwrap();
    source.handle_data(&ok_reply(1)).unwrap();
    source
        .handle_data("OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nRequire: org.wfa.wfd1.0\r\n\r\n")
        .unwrap();
    outbox.drain();

    let body = "wfd_audio_codecs: LPCM 00000003 00\r\n";
    let reply = format!(
        "RTSP/1.0 200 OK\r\nCSeq: 2\r\nContent-Type: text/parameters\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let err = source.handle_data(&reply).unwrap_err();
    assert!(matches!(err, WfdError::MissingProperty { .. }), "{err}");
    assert_eq!(source.state(), SessionState::Failed);
    assert!(outbox.drain().iter().all(|text| !text.starts_with("SET_PARAMETER")));
}

#[test]
fn loopback_session_reaches_streaming() {
    let link = Link::establish();

    assert_eq!(*link.source_calls.lock(), vec!["play"]);
    assert_eq!(*link.sink_calls.lock(), vec!["play"]);
    assert!(!link.source.media().is_paused());

    // 1920x1080 exceeds the sink's native 720p, so 1280x720p30 is chosen.
    let expected = H264VideoFormat::new(
        H264Profile::ConstrainedBaseline,
        H264Level::L3_1,
        ResolutionType::Cea,
        5,
    );
    assert_eq!(link.source.media().optimal_video_format(), expected);
    assert_eq!(*link.sink_format.lock(), Some(expected));
    assert_eq!(
        link.source.media().optimal_audio_codec(),
        AudioCodec::new(AudioFormat::Lpcm, 0x1)
    );
    assert_eq!(link.source.media().sink_rtp_ports(), (19000, 0));

    let sink = link.sink.media();
    assert_eq!(
        sink.presentation_url(),
        Some("rtsp://192.168.49.1/wfd1.0/streamid=0")
    );
    let session = sink.session_id().unwrap();
    assert_eq!(session.len(), 16);
    assert!(session.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn source_pause_and_play_triggers_round_trip() {
    let mut link = Link::establish();

    link.source.pause().unwrap();
    link.pump().unwrap();
    assert!(link.source.media().is_paused());
    assert!(link.sink.media().is_paused());

    link.source.play().unwrap();
    link.pump().unwrap();
    assert!(!link.source.media().is_paused());
    assert_eq!(*link.sink_calls.lock(), vec!["play", "pause", "play"]);
    assert_eq!(link.source.state(), SessionState::Running);
    assert_eq!(link.sink.state(), SessionState::Running);
}

#[test]
fn sink_pause_command_is_answered_once() {
    let mut link = Link::establish();

    link.sink.pause().unwrap();
    let pause = link.sink_out.pop().unwrap();
    assert!(
        pause.starts_with("PAUSE rtsp://192.168.49.1/wfd1.0/streamid=0 RTSP/1.0\r\n"),
        "{pause}"
    );
    assert!(pause.contains("Session: "));
    link.source.handle_data(&pause).unwrap();

    let reply = link.source_out.pop().unwrap();
    assert!(link.source_out.is_empty());
    link.sink.handle_data(&reply).unwrap();

    assert_eq!(*link.source_calls.lock(), vec!["play", "pause"]);
    assert_eq!(*link.sink_calls.lock(), vec!["play", "pause"]);
}

#[test]
fn teardown_trigger_completes_both_sides() {
    let mut link = Link::establish();

    link.source.teardown().unwrap();
    link.pump().unwrap();

    assert_eq!(link.source.state(), SessionState::Completed);
    assert_eq!(link.sink.state(), SessionState::Completed);
    assert_eq!(link.source_calls.lock().last(), Some(&"teardown"));
    assert_eq!(link.sink_calls.lock().last(), Some(&"teardown"));
    assert!(matches!(
        link.source.handle_data(&ok_reply(99)),
        Err(WfdError::NotRunning)
    ));
}

#[test]
fn idr_requests_can_repeat() {
    let mut link = Link::establish();

    link.sink.request_idr().unwrap();
    link.pump().unwrap();
    link.sink.request_idr().unwrap();
    link.pump().unwrap();

    assert_eq!(*link.source_calls.lock(), vec!["play", "idr", "idr"]);
}

#[test]
fn keep_alive_replies_must_arrive_in_order() {
    let mut link = Link::establish();

    let first = link.source.next_cseq();
    link.source.send_keep_alive().unwrap();
    link.source.send_keep_alive().unwrap();
    assert_eq!(link.source_out.len(), 2);
    link.source_out.drain();

    link.source.handle_data(&ok_reply(first)).unwrap();
    link.source.handle_data(&ok_reply(first + 1)).unwrap();
    assert_eq!(link.source.state(), SessionState::Running);

    let next = link.source.next_cseq();
    link.source.send_keep_alive().unwrap();
    link.source.send_keep_alive().unwrap();
    let err = link.source.handle_data(&ok_reply(next + 1)).unwrap_err();
    assert!(matches!(err, WfdError::UnexpectedMessage(_)), "{err}");
    assert_eq!(link.source.state(), SessionState::Failed);
}

#[test]
fn keep_alive_is_answered_by_the_sink() {
    let mut link = Link::establish();

    link.source.send_keep_alive().unwrap();
    link.pump().unwrap();
    link.source.send_keep_alive().unwrap();
    link.pump().unwrap();
    assert_eq!(link.source.state(), SessionState::Running);
    assert_eq!(link.sink.state(), SessionState::Running);
}

#[test]
fn start_is_idempotent() {
    let outbox = Outbox::default();
    let mut source = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    source.start().unwrap();
    source.start().unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(source.next_cseq(), 2);
}

#[test]
fn restart_after_reset_replays_the_same_states() {
    fn walk(source: &mut Source, outbox: &Outbox) -> Vec<(Option<&'static str>, String)> {
        let mut trace = Vec::new();
        source.start().unwrap();
        let m1 = outbox.pop().unwrap();
        trace.push((source.current_state(), start_line(&m1).to_string()));

        let cseq = source.next_cseq() - 1;
        source.handle_data(&ok_reply(cseq)).unwrap();
        source
            .handle_data("OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nRequire: org.wfa.wfd1.0\r\n\r\n")
            .unwrap();
        for text in outbox.drain() {
            trace.push((source.current_state(), start_line(&text).to_string()));
        }
        trace
    }

    let fresh_outbox = Outbox::default();
    let mut fresh = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(fresh_outbox.clone()),
    );
    let expected = walk(&mut fresh, &fresh_outbox);

    let outbox = Outbox::default();
    let mut source = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    source.start().unwrap();
    outbox.drain();
    source.reset();
    assert_eq!(source.state(), SessionState::Idle);
    assert_eq!(source.current_state(), None);

    assert_eq!(walk(&mut source, &outbox), expected);
}

#[test]
fn reply_timeout_fails_the_session() {
    let outbox = Outbox::default();
    let mut source = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    source.start().unwrap();

    let timers = outbox.armed_timers();
    assert_eq!(timers.len(), 1);

    source.on_timer_event(wfd::TimerId(999)).unwrap();
    assert_eq!(source.state(), SessionState::Running);

    let err = source.on_timer_event(timers[0]).unwrap_err();
    assert!(matches!(err, WfdError::ReplyTimeout(id) if id == timers[0]));
    assert_eq!(source.state(), SessionState::Failed);
    assert!(outbox.armed_timers().is_empty());
}

#[test]
fn answered_request_releases_its_timer() {
    let outbox = Outbox::default();
    let mut source = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    source.start().unwrap();
    source.handle_data(&ok_reply(1)).unwrap();
    assert!(outbox.armed_timers().is_empty());
}

#[test]
fn commands_before_streaming_are_rejected() {
    let outbox = Outbox::default();
    let mut source = Source::new(
        Box::new(Encoder::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    assert!(matches!(source.play(), Err(WfdError::NotRunning)));

    source.start().unwrap();
    outbox.drain();
    assert!(matches!(source.play(), Err(WfdError::CommandRejected("play"))));
    assert_eq!(source.state(), SessionState::Running);
    assert!(outbox.is_empty());
}

#[test]
fn unexpected_request_resets_the_sink() {
    let outbox = Outbox::default();
    let mut sink = Sink::new(
        Box::new(Display::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    sink.start().unwrap();

    let err = sink
        .handle_data("PLAY rtsp://localhost/wfd1.0 RTSP/1.0\r\nCSeq: 1\r\n\r\n")
        .unwrap_err();
    assert!(matches!(err, WfdError::UnidentifiedRequest { .. }), "{err}");
    assert_eq!(sink.state(), SessionState::Failed);
}

#[test]
fn malformed_text_leaves_the_session_alone() {
    let outbox = Outbox::default();
    let mut sink = Sink::new(
        Box::new(Display::new(Calls::default())),
        Box::new(outbox.clone()),
    );
    sink.start().unwrap();

    assert!(matches!(
        sink.handle_data("garbage\r\n\r\n"),
        Err(WfdError::Parse { .. })
    ));
    assert_eq!(sink.state(), SessionState::Running);
    assert_eq!(sink.current_state(), Some("Init"));
}
