use std::collections::BTreeMap;
use std::fmt;

use super::audio_codec::{self, AudioCodec};
use super::video_format::VideoFormats;
use crate::error::{ParseErrorKind, Result, WfdError};

/// WFD parameter names (WFD §6.1, Table 5-2 subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKind {
    AudioCodecs,
    VideoFormats,
    ClientRtpPorts,
    PresentationUrl,
    TriggerMethod,
    IdrRequest,
    UibcCapability,
    UibcSetting,
    Standby,
    Route,
    ConnectorType,
}

impl PropertyKind {
    pub const ALL: [PropertyKind; 11] = [
        Self::AudioCodecs,
        Self::VideoFormats,
        Self::ClientRtpPorts,
        Self::PresentationUrl,
        Self::TriggerMethod,
        Self::IdrRequest,
        Self::UibcCapability,
        Self::UibcSetting,
        Self::Standby,
        Self::Route,
        Self::ConnectorType,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AudioCodecs => "wfd_audio_codecs",
            Self::VideoFormats => "wfd_video_formats",
            Self::ClientRtpPorts => "wfd_client_rtp_ports",
            Self::PresentationUrl => "wfd_presentation_URL",
            Self::TriggerMethod => "wfd_trigger_method",
            Self::IdrRequest => "wfd_idr_request",
            Self::UibcCapability => "wfd_uibc_capability",
            Self::UibcSetting => "wfd_uibc_setting",
            Self::Standby => "wfd_standby",
            Self::Route => "wfd_route",
            Self::ConnectorType => "wfd_connector_type",
        }
    }

    /// Parameter names are matched case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `wfd_client_rtp_ports`: where the sink receives the media stream.
///
/// ```text
/// wfd_client_rtp_ports: RTP/AVP/UDP;unicast 19000 0 mode=play
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRtpPorts {
    pub rtp_port_0: u16,
    /// Second port for a coupled sink, `0` when unused.
    pub rtp_port_1: u16,
}

impl ClientRtpPorts {
    pub const PROFILE: &'static str = "RTP/AVP/UDP;unicast";

    pub fn new(rtp_port_0: u16, rtp_port_1: u16) -> Self {
        Self {
            rtp_port_0,
            rtp_port_1,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() != 4 || !parts[0].eq_ignore_ascii_case(Self::PROFILE) {
            return None;
        }
        if parts[3] != "mode=play" {
            return None;
        }
        Some(Self::new(parts[1].parse().ok()?, parts[2].parse().ok()?))
    }
}

impl fmt::Display for ClientRtpPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} mode=play",
            Self::PROFILE,
            self.rtp_port_0,
            self.rtp_port_1
        )
    }
}

/// `wfd_presentation_URL`: resource addresses of the primary and
/// secondary sink streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationUrl {
    pub url_0: Option<String>,
    pub url_1: Option<String>,
}

impl PresentationUrl {
    pub fn primary(url: &str) -> Self {
        Self {
            url_0: Some(url.to_string()),
            url_1: None,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace();
        let url = |token: Option<&str>| match token {
            Some("none") | None => None,
            Some(url) => Some(url.to_string()),
        };
        let url_0 = url(parts.next());
        let url_1 = url(parts.next());
        Some(Self { url_0, url_1 })
    }
}

impl fmt::Display for PresentationUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.url_0.as_deref().unwrap_or("none"),
            self.url_1.as_deref().unwrap_or("none")
        )
    }
}

/// `wfd_trigger_method`: asks the sink to issue the named request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerMethod {
    Setup,
    Play,
    Pause,
    Teardown,
}

impl TriggerMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "SETUP" => Some(Self::Setup),
            "PLAY" => Some(Self::Play),
            "PAUSE" => Some(Self::Pause),
            "TEARDOWN" => Some(Self::Teardown),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCategory {
    Generic,
    Hidc,
}

impl InputCategory {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "GENERIC",
            Self::Hidc => "HIDC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericInput {
    Keyboard,
    Mouse,
    SingleTouch,
    MultiTouch,
    Joystick,
    Camera,
    Gesture,
    RemoteControl,
}

impl GenericInput {
    const ALL: [GenericInput; 8] = [
        Self::Keyboard,
        Self::Mouse,
        Self::SingleTouch,
        Self::MultiTouch,
        Self::Joystick,
        Self::Camera,
        Self::Gesture,
        Self::RemoteControl,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Keyboard => "Keyboard",
            Self::Mouse => "Mouse",
            Self::SingleTouch => "SingleTouch",
            Self::MultiTouch => "MultiTouch",
            Self::Joystick => "Joystick",
            Self::Camera => "Camera",
            Self::Gesture => "Gesture",
            Self::RemoteControl => "RemoteControl",
        }
    }
}

/// `wfd_uibc_capability`: user input back channel support.
///
/// ```text
/// wfd_uibc_capability: input_category_list=GENERIC;generic_cap_list=Keyboard, Mouse;hidc_cap_list=none;port=none
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UibcCapability {
    pub input_categories: Vec<InputCategory>,
    pub generic_capabilities: Vec<GenericInput>,
    /// `type/path` pairs such as `Keyboard/USB`, kept verbatim.
    pub hidc_capabilities: Vec<String>,
    pub port: Option<u16>,
}

impl UibcCapability {
    fn parse(value: &str) -> Option<Self> {
        let mut capability = Self::default();
        for field in value.split(';') {
            let (key, list) = field.split_once('=')?;
            let items = list
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty() && *item != "none");
            match key.trim() {
                "input_category_list" => {
                    for item in items {
                        capability.input_categories.push(match item {
                            "GENERIC" => InputCategory::Generic,
                            "HIDC" => InputCategory::Hidc,
                            _ => return None,
                        });
                    }
                }
                "generic_cap_list" => {
                    for item in items {
                        let input = GenericInput::ALL.into_iter().find(|g| g.as_str() == item)?;
                        capability.generic_capabilities.push(input);
                    }
                }
                "hidc_cap_list" => capability.hidc_capabilities = items.map(String::from).collect(),
                "port" => {
                    capability.port = match list.trim() {
                        "none" => None,
                        port => Some(port.parse().ok()?),
                    }
                }
                _ => return None,
            }
        }
        Some(capability)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, names: Vec<&str>) -> fmt::Result {
    if names.is_empty() {
        return f.write_str("none");
    }
    f.write_str(&names.join(", "))
}

impl fmt::Display for UibcCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("input_category_list=")?;
        write_list(f, self.input_categories.iter().map(InputCategory::as_str).collect())?;
        f.write_str(";generic_cap_list=")?;
        write_list(f, self.generic_capabilities.iter().map(GenericInput::as_str).collect())?;
        f.write_str(";hidc_cap_list=")?;
        write_list(f, self.hidc_capabilities.iter().map(String::as_str).collect())?;
        match self.port {
            Some(port) => write!(f, ";port={port}"),
            None => f.write_str(";port=none"),
        }
    }
}

/// `wfd_route`: which sink of a coupled pair renders the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRoute {
    Primary,
    Secondary,
}

/// A typed WFD parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Empty list serializes as `none`.
    AudioCodecs(Vec<AudioCodec>),
    /// `None` serializes as `none`.
    VideoFormats(Option<VideoFormats>),
    ClientRtpPorts(ClientRtpPorts),
    PresentationUrl(PresentationUrl),
    TriggerMethod(TriggerMethod),
    IdrRequest,
    UibcCapability(Option<UibcCapability>),
    UibcSetting(bool),
    Standby,
    Route(AudioRoute),
    ConnectorType(Option<u8>),
}

impl Property {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::AudioCodecs(_) => PropertyKind::AudioCodecs,
            Self::VideoFormats(_) => PropertyKind::VideoFormats,
            Self::ClientRtpPorts(_) => PropertyKind::ClientRtpPorts,
            Self::PresentationUrl(_) => PropertyKind::PresentationUrl,
            Self::TriggerMethod(_) => PropertyKind::TriggerMethod,
            Self::IdrRequest => PropertyKind::IdrRequest,
            Self::UibcCapability(_) => PropertyKind::UibcCapability,
            Self::UibcSetting(_) => PropertyKind::UibcSetting,
            Self::Standby => PropertyKind::Standby,
            Self::Route(_) => PropertyKind::Route,
            Self::ConnectorType(_) => PropertyKind::ConnectorType,
        }
    }

    /// Parse the value part of a `name: value` line.
    pub fn parse(kind: PropertyKind, value: &str) -> Result<Self> {
        let value = value.trim();
        let invalid = || WfdError::parse(ParseErrorKind::InvalidProperty(kind.name()));
        let property = match kind {
            PropertyKind::AudioCodecs => {
                Self::AudioCodecs(audio_codec::parse_list(value).ok_or_else(invalid)?)
            }
            PropertyKind::VideoFormats => match value {
                "none" => Self::VideoFormats(None),
                _ => Self::VideoFormats(Some(VideoFormats::parse(value).ok_or_else(invalid)?)),
            },
            PropertyKind::ClientRtpPorts => {
                Self::ClientRtpPorts(ClientRtpPorts::parse(value).ok_or_else(invalid)?)
            }
            PropertyKind::PresentationUrl => {
                Self::PresentationUrl(PresentationUrl::parse(value).ok_or_else(invalid)?)
            }
            PropertyKind::TriggerMethod => {
                Self::TriggerMethod(TriggerMethod::parse(value).ok_or_else(invalid)?)
            }
            PropertyKind::IdrRequest => Self::IdrRequest,
            PropertyKind::Standby => Self::Standby,
            PropertyKind::UibcCapability => match value {
                "none" => Self::UibcCapability(None),
                _ => Self::UibcCapability(Some(UibcCapability::parse(value).ok_or_else(invalid)?)),
            },
            PropertyKind::UibcSetting => match value {
                "enable" => Self::UibcSetting(true),
                "disable" => Self::UibcSetting(false),
                _ => return Err(invalid()),
            },
            PropertyKind::Route => match value {
                "primary" => Self::Route(AudioRoute::Primary),
                "secondary" => Self::Route(AudioRoute::Secondary),
                _ => return Err(invalid()),
            },
            PropertyKind::ConnectorType => match value {
                "none" => Self::ConnectorType(None),
                _ => Self::ConnectorType(Some(
                    u8::from_str_radix(value, 16).map_err(|_| invalid())?,
                )),
            },
        };
        Ok(property)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().name())?;
        match self {
            Self::IdrRequest | Self::Standby => Ok(()),
            Self::AudioCodecs(codecs) if codecs.is_empty() => f.write_str(": none"),
            Self::AudioCodecs(codecs) => {
                let codecs: Vec<String> = codecs.iter().map(AudioCodec::to_string).collect();
                write!(f, ": {}", codecs.join(", "))
            }
            Self::VideoFormats(None) | Self::UibcCapability(None) | Self::ConnectorType(None) => {
                f.write_str(": none")
            }
            Self::VideoFormats(Some(formats)) => write!(f, ": {formats}"),
            Self::ClientRtpPorts(ports) => write!(f, ": {ports}"),
            Self::PresentationUrl(url) => write!(f, ": {url}"),
            Self::TriggerMethod(method) => write!(f, ": {method}"),
            Self::UibcCapability(Some(capability)) => write!(f, ": {capability}"),
            Self::UibcSetting(true) => f.write_str(": enable"),
            Self::UibcSetting(false) => f.write_str(": disable"),
            Self::Route(AudioRoute::Primary) => f.write_str(": primary"),
            Self::Route(AudioRoute::Secondary) => f.write_str(": secondary"),
            Self::ConnectorType(Some(connector)) => write!(f, ": {connector:02X}"),
        }
    }
}

/// Body of a WFD message: at most one property per kind, plus the
/// parameter names a GET_PARAMETER request asks for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    properties: BTreeMap<PropertyKind, Property>,
    parameters: Vec<PropertyKind>,
}

impl Payload {
    /// A GET_PARAMETER body listing the parameters to query.
    pub fn with_parameters(parameters: &[PropertyKind]) -> Self {
        let mut payload = Self::default();
        for kind in parameters {
            payload.request_parameter(*kind);
        }
        payload
    }

    /// Add a property, replacing any previous value of the same kind.
    pub fn insert(&mut self, property: Property) -> Option<Property> {
        self.properties.insert(property.kind(), property)
    }

    pub fn get(&self, kind: PropertyKind) -> Option<&Property> {
        self.properties.get(&kind)
    }

    pub fn has(&self, kind: PropertyKind) -> bool {
        self.properties.contains_key(&kind)
    }

    pub fn remove(&mut self, kind: PropertyKind) -> Option<Property> {
        self.properties.remove(&kind)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn request_parameter(&mut self, kind: PropertyKind) {
        if !self.parameters.contains(&kind) {
            self.parameters.push(kind);
        }
    }

    pub fn parameters(&self) -> &[PropertyKind] {
        &self.parameters
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.parameters.is_empty()
    }

    pub fn video_formats(&self) -> Option<&VideoFormats> {
        match self.get(PropertyKind::VideoFormats) {
            Some(Property::VideoFormats(formats)) => formats.as_ref(),
            _ => None,
        }
    }

    pub fn audio_codecs(&self) -> Option<&[AudioCodec]> {
        match self.get(PropertyKind::AudioCodecs) {
            Some(Property::AudioCodecs(codecs)) => Some(codecs),
            _ => None,
        }
    }

    pub fn client_rtp_ports(&self) -> Option<&ClientRtpPorts> {
        match self.get(PropertyKind::ClientRtpPorts) {
            Some(Property::ClientRtpPorts(ports)) => Some(ports),
            _ => None,
        }
    }

    pub fn presentation_url(&self) -> Option<&PresentationUrl> {
        match self.get(PropertyKind::PresentationUrl) {
            Some(Property::PresentationUrl(url)) => Some(url),
            _ => None,
        }
    }

    pub fn trigger_method(&self) -> Option<TriggerMethod> {
        match self.get(PropertyKind::TriggerMethod) {
            Some(Property::TriggerMethod(method)) => Some(*method),
            _ => None,
        }
    }

    /// Parse body lines. `name: value` lines become properties, bare names
    /// become requested parameters. Unknown names are skipped.
    pub(crate) fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut payload = Self::default();
        for line in lines.map(str::trim).filter(|line| !line.is_empty()) {
            let (name, value) = match line.split_once(':') {
                Some((name, value)) => (name, Some(value)),
                None => (line, None),
            };
            let Some(kind) = PropertyKind::from_name(name) else {
                tracing::trace!(name, "skipping unknown parameter");
                continue;
            };
            match value {
                Some(value) => {
                    payload.insert(Property::parse(kind, value)?);
                }
                None if matches!(kind, PropertyKind::IdrRequest | PropertyKind::Standby) => {
                    payload.insert(Property::parse(kind, "")?);
                }
                None => payload.request_parameter(kind),
            }
        }
        Ok(payload)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in &self.parameters {
            write!(f, "{kind}\r\n")?;
        }
        for property in self.properties.values() {
            write!(f, "{property}\r\n")?;
        }
        Ok(())
    }
}
