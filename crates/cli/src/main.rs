use std::io::{self, BufRead};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use wfd::protocol::{
    AudioCodec, AudioFormat, H264Level, H264Profile, H264VideoFormat, NativeVideoFormat,
    ResolutionType, find_optimal_audio_codec, find_optimal_video_format,
};
use wfd::{
    MediaManager, Outbox, SessionState, Sink, SinkMediaManager, Source, SourceMediaManager,
};

#[derive(Parser)]
#[command(
    name = "wfd-session",
    about = "Run a Wi-Fi Display source and sink against each other in-process"
)]
struct Args {
    /// Address the source reports in the presentation URL
    #[arg(long, default_value = "192.168.49.1")]
    source_ip: String,

    /// Address of the sink's side of the link
    #[arg(long, default_value = "192.168.49.10")]
    sink_ip: String,

    /// RTP port the source streams from
    #[arg(long, default_value_t = 16384)]
    server_port: u16,

    /// RTP port the sink listens on
    #[arg(long, default_value_t = 19000)]
    client_port: u16,

    /// Commands to run once streaming, in order
    #[arg(value_enum, default_values_t = [Command::Pause, Command::Play, Command::KeepAlive, Command::Idr, Command::Teardown])]
    commands: Vec<Command>,

    /// Then read further commands from stdin, one per line
    #[arg(long)]
    stdin: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Source triggers PLAY
    Play,
    /// Source triggers PAUSE
    Pause,
    /// Source triggers TEARDOWN
    Teardown,
    /// Source sends a keep-alive
    KeepAlive,
    /// Sink asks for an IDR picture
    Idr,
    /// Sink pauses on its own
    SinkPause,
    /// Sink resumes on its own
    SinkPlay,
}

fn formats() -> Vec<H264VideoFormat> {
    [0, 5, 6, 7]
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

/// Source media that only logs what it is asked to do.
struct DemoSource {
    rtp_port: u16,
    paused: bool,
    sink_ports: (u16, u16),
    video: Option<H264VideoFormat>,
    audio: Option<AudioCodec>,
}

impl MediaManager for DemoSource {
    fn play(&mut self) {
        self.paused = false;
        tracing::info!(role = "source", "media playing");
    }

    fn pause(&mut self) {
        self.paused = true;
        tracing::info!(role = "source", "media paused");
    }

    fn teardown(&mut self) {
        self.paused = true;
        tracing::info!(role = "source", "media torn down");
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

impl SourceMediaManager for DemoSource {
    fn set_sink_rtp_ports(&mut self, port_0: u16, port_1: u16) {
        tracing::info!(port_0, port_1, "sink rtp ports");
        self.sink_ports = (port_0, port_1);
    }

    fn sink_rtp_ports(&self) -> (u16, u16) {
        self.sink_ports
    }

    fn local_rtp_port(&self) -> u16 {
        self.rtp_port
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
        tracing::info!(format = ?self.video, "video format chosen");
        self.video.is_some()
    }

    fn optimal_video_format(&self) -> H264VideoFormat {
        self.video.unwrap_or_else(|| formats()[0])
    }

    fn init_optimal_audio_codec(&mut self, sink_codecs: &[AudioCodec]) -> bool {
        let local = [
            AudioCodec::new(AudioFormat::Aac, 0x1),
            AudioCodec::new(AudioFormat::Lpcm, 0x3),
        ];
        self.audio = find_optimal_audio_codec(&local, sink_codecs);
        self.audio.is_some()
    }

    fn optimal_audio_codec(&self) -> AudioCodec {
        self.audio.unwrap_or(AudioCodec::new(AudioFormat::Lpcm, 0x1))
    }

    fn send_idr_picture(&mut self) {
        tracing::info!("IDR picture sent");
    }
}

/// Sink media that only logs what it is asked to do.
struct DemoSink {
    rtp_port: u16,
    paused: bool,
    url: Option<String>,
    session: Option<String>,
}

impl MediaManager for DemoSink {
    fn play(&mut self) {
        self.paused = false;
        tracing::info!(role = "sink", "media playing");
    }

    fn pause(&mut self) {
        self.paused = true;
        tracing::info!(role = "sink", "media paused");
    }

    fn teardown(&mut self) {
        self.paused = true;
        tracing::info!(role = "sink", "media torn down");
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

impl SinkMediaManager for DemoSink {
    fn local_rtp_ports(&self) -> (u16, u16) {
        (self.rtp_port, 0)
    }

    fn set_presentation_url(&mut self, url: &str) {
        tracing::info!(url, "presentation url");
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
        NativeVideoFormat::new(ResolutionType::Cea, 8)
    }

    fn supported_audio_codecs(&self) -> Vec<AudioCodec> {
        vec![AudioCodec::new(AudioFormat::Lpcm, 0x3)]
    }

    fn set_optimal_video_format(&mut self, format: &H264VideoFormat) -> bool {
        tracing::info!(format = ?format, "decoder configured");
        true
    }
}

/// Both engines and the links between them.
struct Loopback {
    source: Source,
    sink: Sink,
    source_out: Outbox,
    sink_out: Outbox,
}

impl Loopback {
    /// Carry queued messages between the two engines until both go quiet.
    fn pump(&mut self) -> wfd::Result<()> {
        loop {
            let mut idle = true;
            if let Some(text) = self.source_out.pop() {
                idle = false;
                tracing::trace!(%text, "source -> sink");
                self.sink.handle_data(&text)?;
            }
            if let Some(text) = self.sink_out.pop() {
                idle = false;
                tracing::trace!(%text, "sink -> source");
                self.source.handle_data(&text)?;
            }
            if idle {
                return Ok(());
            }
        }
    }

    fn execute(&mut self, command: Command) -> wfd::Result<()> {
        tracing::info!(?command, "running command");
        match command {
            Command::Play => self.source.play()?,
            Command::Pause => self.source.pause()?,
            Command::Teardown => self.source.teardown()?,
            Command::KeepAlive => self.source.send_keep_alive()?,
            Command::Idr => self.sink.request_idr()?,
            Command::SinkPause => self.sink.pause()?,
            Command::SinkPlay => self.sink.play()?,
        }
        self.pump()
    }

    fn is_running(&self) -> bool {
        self.source.state() == SessionState::Running
    }
}

fn run(args: &Args) -> wfd::Result<()> {
    let source_out = Outbox::new(&args.source_ip);
    let sink_out = Outbox::new(&args.sink_ip);

    let source = Source::new(
        Box::new(DemoSource {
            rtp_port: args.server_port,
            paused: true,
            sink_ports: (0, 0),
            video: None,
            audio: None,
        }),
        Box::new(source_out.clone()),
    );
    let sink = Sink::new(
        Box::new(DemoSink {
            rtp_port: args.client_port,
            paused: true,
            url: None,
            session: None,
        }),
        Box::new(sink_out.clone()),
    );
    let mut link = Loopback {
        source,
        sink,
        source_out,
        sink_out,
    };

    link.sink.start()?;
    link.source.start()?;
    link.pump()?;
    tracing::info!(
        source = link.source.current_state(),
        sink = link.sink.current_state(),
        "session established"
    );

    for command in &args.commands {
        if !link.is_running() {
            tracing::warn!(?command, "session over, skipping");
            continue;
        }
        link.execute(*command)?;
    }

    if args.stdin {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match Command::from_str(line, true) {
                Ok(command) if link.is_running() => link.execute(command)?,
                Ok(_) => {
                    tracing::warn!("session over");
                    break;
                }
                Err(e) => tracing::warn!(input = line, error = %e, "unknown command"),
            }
        }
    }

    tracing::info!(source = ?link.source.state(), sink = ?link.sink.state(), "done");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            ExitCode::FAILURE
        }
    }
}
