//! H.264 video format negotiation (`wfd_video_formats`, WFD §6.1.3).
//!
//! A device advertises its native resolution plus, per H.264 profile and
//! level, three bitmaps of supported resolution/refresh combinations
//! (CEA, VESA and handheld tables). The source expands the sink's
//! bitmaps into individual [`H264VideoFormat`]s, picks one, and commits
//! it back as a single-bit [`VideoFormats`] value in M4.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ResolutionType {
    #[default]
    Cea = 0,
    Vesa = 1,
    Hh = 2,
}

impl ResolutionType {
    fn table(&self) -> &'static [Resolution] {
        match self {
            Self::Cea => CEA_RESOLUTIONS,
            Self::Vesa => VESA_RESOLUTIONS,
            Self::Hh => HH_RESOLUTIONS,
        }
    }
}

/// A row of one of the resolution/refresh tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub interlaced: bool,
}

const fn p(width: u32, height: u32, fps: u32) -> Resolution {
    Resolution {
        width,
        height,
        fps,
        interlaced: false,
    }
}

const fn i(width: u32, height: u32, fps: u32) -> Resolution {
    Resolution {
        width,
        height,
        fps,
        interlaced: true,
    }
}

/// WFD Table 5-10.
const CEA_RESOLUTIONS: &[Resolution] = &[
    p(640, 480, 60),
    p(720, 480, 60),
    i(720, 480, 60),
    p(720, 576, 50),
    i(720, 576, 50),
    p(1280, 720, 30),
    p(1280, 720, 60),
    p(1920, 1080, 30),
    p(1920, 1080, 60),
    i(1920, 1080, 60),
    p(1280, 720, 25),
    p(1280, 720, 50),
    p(1920, 1080, 25),
    p(1920, 1080, 50),
    i(1920, 1080, 50),
    p(1280, 720, 24),
    p(1920, 1080, 24),
];

/// WFD Table 5-11.
const VESA_RESOLUTIONS: &[Resolution] = &[
    p(800, 600, 30),
    p(800, 600, 60),
    p(1024, 768, 30),
    p(1024, 768, 60),
    p(1152, 864, 30),
    p(1152, 864, 60),
    p(1280, 768, 30),
    p(1280, 768, 60),
    p(1280, 800, 30),
    p(1280, 800, 60),
    p(1360, 768, 30),
    p(1360, 768, 60),
    p(1366, 768, 30),
    p(1366, 768, 60),
    p(1280, 1024, 30),
    p(1280, 1024, 60),
    p(1400, 1050, 30),
    p(1400, 1050, 60),
    p(1440, 900, 30),
    p(1440, 900, 60),
    p(1600, 900, 30),
    p(1600, 900, 60),
    p(1600, 1200, 30),
    p(1600, 1200, 60),
    p(1680, 1024, 30),
    p(1680, 1024, 60),
    p(1680, 1050, 30),
    p(1680, 1050, 60),
    p(1920, 1200, 30),
    p(1920, 1200, 60),
];

/// WFD Table 5-12.
const HH_RESOLUTIONS: &[Resolution] = &[
    p(800, 480, 30),
    p(800, 480, 60),
    p(854, 480, 30),
    p(854, 480, 60),
    p(864, 480, 30),
    p(864, 480, 60),
    p(640, 360, 30),
    p(640, 360, 60),
    p(960, 540, 30),
    p(960, 540, 60),
    p(848, 480, 30),
    p(848, 480, 60),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum H264Profile {
    ConstrainedBaseline,
    ConstrainedHigh,
}

impl H264Profile {
    fn bit(&self) -> u8 {
        match self {
            Self::ConstrainedBaseline => 0x01,
            Self::ConstrainedHigh => 0x02,
        }
    }

    fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0x01 => Some(Self::ConstrainedBaseline),
            0x02 => Some(Self::ConstrainedHigh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum H264Level {
    L3_1,
    L3_2,
    L4,
    L4_1,
    L4_2,
}

impl H264Level {
    fn bit(&self) -> u8 {
        match self {
            Self::L3_1 => 0x01,
            Self::L3_2 => 0x02,
            Self::L4 => 0x04,
            Self::L4_1 => 0x08,
            Self::L4_2 => 0x10,
        }
    }

    fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0x01 => Some(Self::L3_1),
            0x02 => Some(Self::L3_2),
            0x04 => Some(Self::L4),
            0x08 => Some(Self::L4_1),
            0x10 => Some(Self::L4_2),
            _ => None,
        }
    }
}

/// The device's native display mode. Wire form is one byte: bits 0-2
/// select the table, bits 3-7 the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeVideoFormat {
    pub resolution_type: ResolutionType,
    pub index: u8,
}

impl NativeVideoFormat {
    pub fn new(resolution_type: ResolutionType, index: u8) -> Self {
        Self {
            resolution_type,
            index,
        }
    }

    pub fn to_byte(&self) -> u8 {
        (self.index << 3) | self.resolution_type as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        let resolution_type = match byte & 0x07 {
            0 => ResolutionType::Cea,
            1 => ResolutionType::Vesa,
            2 => ResolutionType::Hh,
            _ => return None,
        };
        Some(Self::new(resolution_type, byte >> 3))
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution_type.table().get(self.index as usize).copied()
    }
}

/// One concrete, selectable format: a profile, a level and one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct H264VideoFormat {
    pub profile: H264Profile,
    pub level: H264Level,
    pub resolution_type: ResolutionType,
    pub index: u8,
}

impl H264VideoFormat {
    pub fn new(
        profile: H264Profile,
        level: H264Level,
        resolution_type: ResolutionType,
        index: u8,
    ) -> Self {
        Self {
            profile,
            level,
            resolution_type,
            index,
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution_type.table().get(self.index as usize).copied()
    }

    /// Pixels per second; `0` for an index outside its table.
    pub fn pixel_rate(&self) -> u64 {
        self.resolution()
            .map(|r| r.width as u64 * r.height as u64 * r.fps as u64)
            .unwrap_or(0)
    }
}

/// One H.264 codec entry of `wfd_video_formats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H264Codec {
    pub profile: H264Profile,
    pub level: H264Level,
    pub cea_support: u32,
    pub vesa_support: u32,
    pub hh_support: u32,
    pub latency: u8,
    pub min_slice_size: u16,
    pub slice_encoding_params: u16,
    pub frame_rate_control: u8,
    pub max_hres: Option<u16>,
    pub max_vres: Option<u16>,
}

impl H264Codec {
    pub fn new(profile: H264Profile, level: H264Level) -> Self {
        Self {
            profile,
            level,
            cea_support: 0,
            vesa_support: 0,
            hh_support: 0,
            latency: 0,
            min_slice_size: 0,
            slice_encoding_params: 0,
            frame_rate_control: 0,
            max_hres: None,
            max_vres: None,
        }
    }

    /// A codec entry advertising exactly `format`.
    pub fn from_format(format: &H264VideoFormat) -> Self {
        let mut codec = Self::new(format.profile, format.level);
        codec.support(format.resolution_type, format.index);
        codec
    }

    /// Set the support bit of one table row.
    pub fn support(&mut self, resolution_type: ResolutionType, index: u8) {
        let bit = 1u32.checked_shl(index as u32).unwrap_or(0);
        match resolution_type {
            ResolutionType::Cea => self.cea_support |= bit,
            ResolutionType::Vesa => self.vesa_support |= bit,
            ResolutionType::Hh => self.hh_support |= bit,
        }
    }

    pub fn selectable_formats(&self) -> Vec<H264VideoFormat> {
        let mut formats = Vec::new();
        for (resolution_type, mask) in [
            (ResolutionType::Cea, self.cea_support),
            (ResolutionType::Vesa, self.vesa_support),
            (ResolutionType::Hh, self.hh_support),
        ] {
            let rows = resolution_type.table().len() as u8;
            formats.extend(
                (0..rows)
                    .filter(|index| mask & (1 << index) != 0)
                    .map(|index| {
                        H264VideoFormat::new(self.profile, self.level, resolution_type, index)
                    }),
            );
        }
        formats
    }

    fn parse(entry: &str) -> Option<Self> {
        let parts: Vec<&str> = entry.split_whitespace().collect();
        if parts.len() != 11 {
            return None;
        }
        let hex8 = |s: &str| u8::from_str_radix(s, 16).ok();
        let hex16 = |s: &str| u16::from_str_radix(s, 16).ok();
        let hex32 = |s: &str| u32::from_str_radix(s, 16).ok();
        let optional = |s: &str| match s {
            "none" => Some(None),
            s => hex16(s).map(Some),
        };
        Some(Self {
            profile: H264Profile::from_bit(hex8(parts[0])?)?,
            level: H264Level::from_bit(hex8(parts[1])?)?,
            cea_support: hex32(parts[2])?,
            vesa_support: hex32(parts[3])?,
            hh_support: hex32(parts[4])?,
            latency: hex8(parts[5])?,
            min_slice_size: hex16(parts[6])?,
            slice_encoding_params: hex16(parts[7])?,
            frame_rate_control: hex8(parts[8])?,
            max_hres: optional(parts[9])?,
            max_vres: optional(parts[10])?,
        })
    }
}

impl fmt::Display for H264Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:08X} {:08X} {:08X} {:02X} {:04X} {:04X} {:02X}",
            self.profile.bit(),
            self.level.bit(),
            self.cea_support,
            self.vesa_support,
            self.hh_support,
            self.latency,
            self.min_slice_size,
            self.slice_encoding_params,
            self.frame_rate_control
        )?;
        for res in [self.max_hres, self.max_vres] {
            match res {
                Some(value) => write!(f, " {value:04X}")?,
                None => f.write_str(" none")?,
            }
        }
        Ok(())
    }
}

/// Value of `wfd_video_formats`.
///
/// ```text
/// wfd_video_formats: 00 00 02 04 0001FFFF 3FFFFFFF 00000000 00 0000 0000 00 none none
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormats {
    pub native: NativeVideoFormat,
    pub preferred_display_mode: u8,
    pub codecs: Vec<H264Codec>,
}

impl VideoFormats {
    pub fn new(native: NativeVideoFormat, codecs: Vec<H264Codec>) -> Self {
        Self {
            native,
            preferred_display_mode: 0,
            codecs,
        }
    }

    /// The M4 form: one codec entry with exactly `format`'s bit set. The
    /// native field is all zeros since only the sink's native mode matters.
    pub fn selected(format: &H264VideoFormat) -> Self {
        Self::new(
            NativeVideoFormat::default(),
            vec![H264Codec::from_format(format)],
        )
    }

    /// Build an advertisement that lists each format under its own
    /// profile/level entry.
    pub fn advertise(native: NativeVideoFormat, formats: &[H264VideoFormat]) -> Self {
        let mut codecs: Vec<H264Codec> = Vec::new();
        for format in formats {
            match codecs
                .iter_mut()
                .find(|c| c.profile == format.profile && c.level == format.level)
            {
                Some(codec) => codec.support(format.resolution_type, format.index),
                None => codecs.push(H264Codec::from_format(format)),
            }
        }
        Self::new(native, codecs)
    }

    pub fn selectable_formats(&self) -> Vec<H264VideoFormat> {
        self.codecs
            .iter()
            .flat_map(H264Codec::selectable_formats)
            .collect()
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        let mut fields = value.splitn(3, ' ');
        let native = NativeVideoFormat::from_byte(u8::from_str_radix(fields.next()?, 16).ok()?)?;
        let preferred_display_mode = u8::from_str_radix(fields.next()?, 16).ok()?;
        let codecs = fields
            .next()?
            .split(',')
            .map(H264Codec::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            native,
            preferred_display_mode,
            codecs,
        })
    }
}

impl fmt::Display for VideoFormats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} ",
            self.native.to_byte(),
            self.preferred_display_mode
        )?;
        let codecs: Vec<String> = self.codecs.iter().map(H264Codec::to_string).collect();
        f.write_str(&codecs.join(", "))
    }
}

/// Choose the format to stream.
///
/// Candidates are the formats both sides support. Formats larger than the
/// remote device's native mode are only considered when nothing else is
/// common. The highest pixel rate wins, then the higher profile and level.
pub fn find_optimal_video_format(
    remote_native: &NativeVideoFormat,
    local: &[H264VideoFormat],
    remote: &[H264VideoFormat],
) -> Option<H264VideoFormat> {
    let common: Vec<H264VideoFormat> = local
        .iter()
        .filter(|format| remote.contains(format))
        .copied()
        .collect();

    let fits_native = |format: &&H264VideoFormat| match (remote_native.resolution(), format.resolution()) {
        (Some(native), Some(res)) => res.width <= native.width && res.height <= native.height,
        _ => true,
    };

    let rank = |format: &&H264VideoFormat| (format.pixel_rate(), format.profile, format.level);

    common
        .iter()
        .filter(fits_native)
        .max_by_key(rank)
        .or_else(|| common.iter().max_by_key(rank))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "00 00 02 04 0001FFFF 3FFFFFFF 00000000 00 0000 0000 00 none none";

    #[test]
    fn parse_sample_advertisement() {
        let formats = VideoFormats::parse(SAMPLE).unwrap();
        assert_eq!(formats.native, NativeVideoFormat::new(ResolutionType::Cea, 0));
        assert_eq!(formats.codecs.len(), 1);
        let codec = &formats.codecs[0];
        assert_eq!(codec.profile, H264Profile::ConstrainedHigh);
        assert_eq!(codec.level, H264Level::L4);
        assert_eq!(codec.cea_support, 0x0001_FFFF);
        assert_eq!(codec.max_hres, None);
        // 17 CEA rows + 30 VESA rows
        assert_eq!(formats.selectable_formats().len(), 47);
        assert_eq!(formats.to_string(), SAMPLE);
    }

    #[test]
    fn native_byte_layout() {
        let native = NativeVideoFormat::new(ResolutionType::Vesa, 5);
        assert_eq!(native.to_byte(), 0x29);
        assert_eq!(NativeVideoFormat::from_byte(0x29), Some(native));
        assert_eq!(NativeVideoFormat::from_byte(0x07), None);
    }

    #[test]
    fn selected_format_sets_one_bit() {
        let format = H264VideoFormat::new(
            H264Profile::ConstrainedBaseline,
            H264Level::L3_1,
            ResolutionType::Cea,
            5,
        );
        let formats = VideoFormats::selected(&format);
        assert_eq!(formats.selectable_formats(), vec![format]);
        assert_eq!(
            formats.to_string(),
            "00 00 01 01 00000020 00000000 00000000 00 0000 0000 00 none none"
        );
    }

    #[test]
    fn optimal_format_prefers_highest_rate_within_native() {
        use H264Level::*;
        use H264Profile::*;
        let hd30 = H264VideoFormat::new(ConstrainedBaseline, L3_1, ResolutionType::Cea, 5);
        let hd60 = H264VideoFormat::new(ConstrainedBaseline, L3_1, ResolutionType::Cea, 6);
        let fhd60 = H264VideoFormat::new(ConstrainedHigh, L4_2, ResolutionType::Cea, 8);
        let vga = H264VideoFormat::new(ConstrainedBaseline, L3_1, ResolutionType::Cea, 0);

        let local = [vga, hd30, hd60, fhd60];
        let remote = [vga, hd30, hd60, fhd60];
        let native_720 = NativeVideoFormat::new(ResolutionType::Cea, 6);
        assert_eq!(find_optimal_video_format(&native_720, &local, &remote), Some(hd60));

        let native_1080 = NativeVideoFormat::new(ResolutionType::Cea, 8);
        assert_eq!(find_optimal_video_format(&native_1080, &local, &remote), Some(fhd60));

        assert_eq!(find_optimal_video_format(&native_720, &[vga], &[hd30]), None);
    }
}
