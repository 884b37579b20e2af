//! Codec identities and sample-count estimation

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DSP_CODEC_TAG;

/// 16-byte codec identity stored in each layer config
///
/// Only the first little-endian word is meaningful for codec detection; the
/// remaining bytes are carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodecId(Uuid);

impl CodecId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Leading little-endian word of the identity
    #[must_use]
    pub fn tag(&self) -> u32 {
        let b = self.as_bytes();
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Whether a DSP ADPCM record follows this layer's config
    #[must_use]
    pub fn is_dsp(&self) -> bool {
        self.tag() == DSP_CODEC_TAG
    }

    #[must_use]
    pub fn kind(&self) -> CodecKind {
        CodecKind::from_tag(self.tag())
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known RenderWare audio codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    PsAdpcm,
    Pcm,
    Float,
    DspAdpcm,
    XboxImaAdpcm,
    Wma,
    Mp3,
    Mp2,
    Mp1,
    Ac3,
    PcImaAdpcm,
    Unknown(u32),
}

impl CodecKind {
    #[must_use]
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            0xD9EA9798 => Self::PsAdpcm,
            0xD01BD217 => Self::Pcm,
            0xDA1E4382 => Self::Float,
            DSP_CODEC_TAG => Self::DspAdpcm,
            0x632FA22B => Self::XboxImaAdpcm,
            0x3F1D8147 => Self::Wma,
            0xBACFB36E => Self::Mp3,
            0x34D09A54 => Self::Mp2,
            0x04C15BA7 => Self::Mp1,
            0xA30DB390 => Self::Ac3,
            0xEF386593 => Self::PcImaAdpcm,
            other => Self::Unknown(other),
        }
    }

    /// Human-readable codec name, `None` for unrecognised tags
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::PsAdpcm => "PS-ADPCM",
            Self::Pcm => "PCM",
            Self::Float => "Float",
            Self::DspAdpcm => "DSP ADPCM",
            Self::XboxImaAdpcm => "Xbox IMA ADPCM",
            Self::Wma => "WMA",
            Self::Mp3 => "MP3",
            Self::Mp2 => "MP2",
            Self::Mp1 => "MP1",
            Self::Ac3 => "AC3",
            Self::PcImaAdpcm => "IMA ADPCM (PC)",
            Self::Unknown(_) => return None,
        })
    }

    /// Estimate decoded sample frames from an encoded payload size.
    ///
    /// Coarse per-codec ratios for display only; unsupported codecs return
    /// the byte count unchanged. A channel count of 0 yields 0.
    #[must_use]
    pub fn estimate_samples(self, encoded_size: u64, channels: u8) -> u64 {
        if channels == 0 {
            return 0;
        }
        let channels = u64::from(channels);
        match self {
            Self::Pcm => encoded_size / (2 * channels),
            Self::PsAdpcm => (encoded_size / channels) * 2,
            Self::DspAdpcm => ((encoded_size / channels) / 8) * 14,
            Self::XboxImaAdpcm | Self::PcImaAdpcm => encoded_size * 2,
            _ => encoded_size,
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name(), self) {
            (Some(name), _) => f.write_str(name),
            (None, Self::Unknown(tag)) => write!(f, "Unknown ({tag:#x})"),
            (None, _) => f.write_str("Unknown"),
        }
    }
}
