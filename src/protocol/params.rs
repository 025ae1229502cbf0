//! Frame parameter record and sample format tags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audio::sample::SampleWidth;
use crate::constants::{MAX_CHANNELS, MAX_PACKET_SIZE};
use crate::error::AudioError;
use crate::protocol::packet::DATA_HEADER_LEN;

/// Sample encoding carried in the data packet header.
///
/// Tag values follow the ALSA `snd_pcm_format_t` numbering so that
/// packets from capture-based senders can be forwarded untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SampleFormat {
    #[default]
    Unknown,
    S8,
    U8,
    S16Le,
    S16Be,
    U16Le,
    U16Be,
    S24Le,
    S24Be,
    U24Le,
    U24Be,
    S32Le,
    S32Be,
    U32Le,
    U32Be,
    FloatLe,
    FloatBe,
    Float64Le,
    Float64Be,
    MuLaw,
    ALaw,
}

impl SampleFormat {
    /// Wire tag for this format
    pub fn tag(self) -> i8 {
        match self {
            SampleFormat::Unknown => -1,
            SampleFormat::S8 => 0,
            SampleFormat::U8 => 1,
            SampleFormat::S16Le => 2,
            SampleFormat::S16Be => 3,
            SampleFormat::U16Le => 4,
            SampleFormat::U16Be => 5,
            SampleFormat::S24Le => 6,
            SampleFormat::S24Be => 7,
            SampleFormat::U24Le => 8,
            SampleFormat::U24Be => 9,
            SampleFormat::S32Le => 10,
            SampleFormat::S32Be => 11,
            SampleFormat::U32Le => 12,
            SampleFormat::U32Be => 13,
            SampleFormat::FloatLe => 14,
            SampleFormat::FloatBe => 15,
            SampleFormat::Float64Le => 16,
            SampleFormat::Float64Be => 17,
            SampleFormat::MuLaw => 20,
            SampleFormat::ALaw => 21,
        }
    }

    /// Map a wire tag back to a format. Unrecognised tags become `Unknown`.
    pub fn from_tag(tag: i8) -> Self {
        match tag {
            0 => SampleFormat::S8,
            1 => SampleFormat::U8,
            2 => SampleFormat::S16Le,
            3 => SampleFormat::S16Be,
            4 => SampleFormat::U16Le,
            5 => SampleFormat::U16Be,
            6 => SampleFormat::S24Le,
            7 => SampleFormat::S24Be,
            8 => SampleFormat::U24Le,
            9 => SampleFormat::U24Be,
            10 => SampleFormat::S32Le,
            11 => SampleFormat::S32Be,
            12 => SampleFormat::U32Le,
            13 => SampleFormat::U32Be,
            14 => SampleFormat::FloatLe,
            15 => SampleFormat::FloatBe,
            16 => SampleFormat::Float64Le,
            17 => SampleFormat::Float64Be,
            20 => SampleFormat::MuLaw,
            21 => SampleFormat::ALaw,
            _ => SampleFormat::Unknown,
        }
    }

    /// Significant bits per sample (0 when unknown)
    pub fn width_bits(self) -> u8 {
        match self {
            SampleFormat::Unknown => 0,
            SampleFormat::S8 | SampleFormat::U8 | SampleFormat::MuLaw | SampleFormat::ALaw => 8,
            SampleFormat::S16Le | SampleFormat::S16Be | SampleFormat::U16Le | SampleFormat::U16Be => 16,
            SampleFormat::S24Le | SampleFormat::S24Be | SampleFormat::U24Le | SampleFormat::U24Be => 24,
            SampleFormat::S32Le
            | SampleFormat::S32Be
            | SampleFormat::U32Le
            | SampleFormat::U32Be
            | SampleFormat::FloatLe
            | SampleFormat::FloatBe => 32,
            SampleFormat::Float64Le | SampleFormat::Float64Be => 64,
        }
    }

    /// Bytes each sample occupies in a buffer (24-bit formats are padded to 4)
    pub fn physical_bytes(self) -> u8 {
        match self.width_bits() {
            0 => 0,
            8 => 1,
            16 => 2,
            24 | 32 => 4,
            _ => 8,
        }
    }

    /// Whether the format is an unsigned integer encoding
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            SampleFormat::U8
                | SampleFormat::U16Le
                | SampleFormat::U16Be
                | SampleFormat::U24Le
                | SampleFormat::U24Be
                | SampleFormat::U32Le
                | SampleFormat::U32Be
        )
    }

    /// Whether multi-byte samples are stored big-endian
    pub fn is_big_endian(self) -> bool {
        matches!(
            self,
            SampleFormat::S16Be
                | SampleFormat::U16Be
                | SampleFormat::S24Be
                | SampleFormat::U24Be
                | SampleFormat::S32Be
                | SampleFormat::U32Be
                | SampleFormat::FloatBe
                | SampleFormat::Float64Be
        )
    }

    /// Short lowercase name, as used in config files and on the command line
    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::Unknown => "unknown",
            SampleFormat::S8 => "s8",
            SampleFormat::U8 => "u8",
            SampleFormat::S16Le => "s16le",
            SampleFormat::S16Be => "s16be",
            SampleFormat::U16Le => "u16le",
            SampleFormat::U16Be => "u16be",
            SampleFormat::S24Le => "s24le",
            SampleFormat::S24Be => "s24be",
            SampleFormat::U24Le => "u24le",
            SampleFormat::U24Be => "u24be",
            SampleFormat::S32Le => "s32le",
            SampleFormat::S32Be => "s32be",
            SampleFormat::U32Le => "u32le",
            SampleFormat::U32Be => "u32be",
            SampleFormat::FloatLe => "f32le",
            SampleFormat::FloatBe => "f32be",
            SampleFormat::Float64Le => "f64le",
            SampleFormat::Float64Be => "f64be",
            SampleFormat::MuLaw => "mulaw",
            SampleFormat::ALaw => "alaw",
        }
    }

    const ALL: [SampleFormat; 21] = [
        SampleFormat::Unknown,
        SampleFormat::S8,
        SampleFormat::U8,
        SampleFormat::S16Le,
        SampleFormat::S16Be,
        SampleFormat::U16Le,
        SampleFormat::U16Be,
        SampleFormat::S24Le,
        SampleFormat::S24Be,
        SampleFormat::U24Le,
        SampleFormat::U24Be,
        SampleFormat::S32Le,
        SampleFormat::S32Be,
        SampleFormat::U32Le,
        SampleFormat::U32Be,
        SampleFormat::FloatLe,
        SampleFormat::FloatBe,
        SampleFormat::Float64Le,
        SampleFormat::Float64Be,
        SampleFormat::MuLaw,
        SampleFormat::ALaw,
    ];

    /// Every known format, `Unknown` included
    pub fn all() -> &'static [SampleFormat] {
        &Self::ALL
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == lower)
            .ok_or_else(|| AudioError::UnsupportedFormat(s.to_string()))
    }
}

impl From<SampleFormat> for String {
    fn from(format: SampleFormat) -> Self {
        format.name().to_string()
    }
}

impl TryFrom<String> for SampleFormat {
    type Error = AudioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Negotiated stream format.
///
/// Compared by value to detect format changes between packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameParams {
    pub format: SampleFormat,
    pub channels_per_frame: u8,
    pub bits_per_channel: u8,
    pub bytes_per_channel: u8,
    pub sample_rate: u32,
}

impl FrameParams {
    /// Build parameters for a known format; bit and byte widths are derived
    pub fn new(format: SampleFormat, channels_per_frame: u8, sample_rate: u32) -> Self {
        Self {
            format,
            channels_per_frame,
            bits_per_channel: format.width_bits(),
            bytes_per_channel: format.physical_bytes(),
            sample_rate,
        }
    }

    /// The "nothing negotiated yet" record
    pub fn cleared() -> Self {
        Self {
            format: SampleFormat::Unknown,
            channels_per_frame: 0,
            bits_per_channel: 0,
            bytes_per_channel: 0,
            sample_rate: 0,
        }
    }

    /// Same format and rate with a different channel count
    pub fn with_channels(self, channels_per_frame: u8) -> Self {
        Self {
            channels_per_frame,
            ..self
        }
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels_per_frame as usize * self.bytes_per_channel as usize
    }

    /// Width the dispatch engine should use for these samples
    pub fn sample_width(&self) -> Option<SampleWidth> {
        SampleWidth::from_bytes(self.bytes_per_channel)
    }

    /// Check the record is usable for routing
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.channels_per_frame == 0 || self.channels_per_frame as usize > MAX_CHANNELS {
            return Err("channel count out of range");
        }
        if self.sample_width().is_none() {
            return Err("unsupported sample width");
        }
        if self.sample_rate == 0 {
            return Err("zero sample rate");
        }
        Ok(())
    }

    /// Duration of `frames` frames in microseconds
    pub fn frames_to_micros(&self, frames: usize) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        frames as u64 * 1_000_000 / self.sample_rate as u64
    }
}

impl Default for FrameParams {
    fn default() -> Self {
        Self::cleared()
    }
}

impl fmt::Display for FrameParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}ch {}bit/{}B {}Hz",
            self.format,
            self.channels_per_frame,
            self.bits_per_channel,
            self.bytes_per_channel,
            self.sample_rate
        )
    }
}

/// Frames that fit in one datagram without IP fragmentation
pub fn frames_per_packet(params: &FrameParams) -> usize {
    let bytes_per_frame = params.bytes_per_frame();
    if bytes_per_frame == 0 {
        return 0;
    }
    (MAX_PACKET_SIZE - DATA_HEADER_LEN) / bytes_per_frame
}
