use std::fmt;

/// Audio coding formats a WFD device may advertise in `wfd_audio_codecs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Lpcm,
    Aac,
    Ac3,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lpcm => "LPCM",
            Self::Aac => "AAC",
            Self::Ac3 => "AC3",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "LPCM" => Some(Self::Lpcm),
            "AAC" => Some(Self::Aac),
            "AC3" => Some(Self::Ac3),
            _ => None,
        }
    }
}

/// One entry of `wfd_audio_codecs`: format, supported-modes bitmap and
/// decoder latency.
///
/// ```text
/// LPCM 00000003 00
/// ```
///
/// For LPCM bit 0 is 44.1 kHz stereo and bit 1 is 48 kHz stereo; for AAC
/// and AC3 the bits select channel layouts (WFD Tables 5-4 to 5-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCodec {
    pub format: AudioFormat,
    pub modes: u32,
    pub latency: u8,
}

impl AudioCodec {
    pub fn new(format: AudioFormat, modes: u32) -> Self {
        Self {
            format,
            modes,
            latency: 0,
        }
    }

    fn parse(entry: &str) -> Option<Self> {
        let parts: Vec<&str> = entry.split_whitespace().collect();
        if parts.len() != 3 {
            return None;
        }
        Some(Self {
            format: AudioFormat::from_token(parts[0])?,
            modes: u32::from_str_radix(parts[1], 16).ok()?,
            latency: u8::from_str_radix(parts[2], 16).ok()?,
        })
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:08X} {:02X}",
            self.format.as_str(),
            self.modes,
            self.latency
        )
    }
}

/// Parse a comma-separated codec list, `none` being the empty list.
pub(crate) fn parse_list(value: &str) -> Option<Vec<AudioCodec>> {
    if value.trim() == "none" {
        return Some(Vec::new());
    }
    value.split(',').map(AudioCodec::parse).collect()
}

/// Pick the codec to stream with.
///
/// Walks `local` in preference order and returns the first format the
/// remote device also supports, narrowed to the highest common mode bit.
pub fn find_optimal_audio_codec(local: &[AudioCodec], remote: &[AudioCodec]) -> Option<AudioCodec> {
    local.iter().find_map(|ours| {
        remote
            .iter()
            .filter(|theirs| theirs.format == ours.format)
            .map(|theirs| theirs.modes & ours.modes)
            .find(|common| *common != 0)
            .map(|common| AudioCodec {
                format: ours.format,
                modes: 1 << (31 - common.leading_zeros()),
                latency: 0,
            })
    })
}
