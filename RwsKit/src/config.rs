//! Layout configuration
//!
//! Alignment constants differ between game builds, so they are supplied at
//! runtime: from a TOML profile file, from CLI flags, or from the manifest
//! written by a previous unpack.
//!
//! ```toml
//! default_profile = "ps2"
//!
//! [profiles.ps2]
//! layer_alignment = 2048
//! segment_alignment = 2048
//!
//! [profiles.gamecube]
//! layer_alignment = 32
//! segment_alignment = 32
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Padding boundaries used by the layout planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Each layer's block is padded to a multiple of this
    pub layer_alignment: u32,
    /// Each segment's size and start are padded to a multiple of this
    pub segment_alignment: u32,
}

impl LayoutConfig {
    /// No padding at all
    pub const NEUTRAL: Self = Self {
        layer_alignment: 1,
        segment_alignment: 1,
    };

    #[must_use]
    pub fn new(layer_alignment: u32, segment_alignment: u32) -> Self {
        Self {
            layer_alignment,
            segment_alignment,
        }
    }

    /// Reject zero alignments
    pub fn validate(&self) -> Result<()> {
        if self.layer_alignment == 0 {
            return Err(Error::InvalidConfig(
                "layer_alignment must be at least 1".to_string(),
            ));
        }
        if self.segment_alignment == 0 {
            return Err(Error::InvalidConfig(
                "segment_alignment must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace individual alignments, keeping the rest
    #[must_use]
    pub fn with_overrides(self, layer: Option<u32>, segment: Option<u32>) -> Self {
        Self {
            layer_alignment: layer.unwrap_or(self.layer_alignment),
            segment_alignment: segment.unwrap_or(self.segment_alignment),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Contents of a layout profile file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Profile used when none is named explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: IndexMap<String, LayoutConfig>,
}

impl ConfigFile {
    /// Load a profile file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::parse(&text)?;
        tracing::debug!(
            "Loaded {} layout profile(s) from {}",
            config.profiles.len(),
            path.as_ref().display()
        );
        Ok(config)
    }

    /// Parse profile TOML, validating every profile
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        for (name, profile) in &config.profiles {
            profile
                .validate()
                .map_err(|e| Error::InvalidConfig(format!("profile {name}: {e}")))?;
        }
        Ok(config)
    }

    /// Resolve a profile by name, falling back to `default_profile`, then the only profile
    pub fn profile(&self, name: Option<&str>) -> Result<LayoutConfig> {
        let wanted = name.or(self.default_profile.as_deref());
        match wanted {
            Some(name) => self
                .profiles
                .get(name)
                .copied()
                .ok_or_else(|| Error::InvalidConfig(format!("unknown layout profile {name:?}"))),
            None if self.profiles.len() == 1 => {
                Ok(self.profiles.values().copied().next().unwrap_or_default())
            }
            None if self.profiles.is_empty() => Ok(LayoutConfig::NEUTRAL),
            None => Err(Error::InvalidConfig(format!(
                "{} profiles defined and none selected",
                self.profiles.len()
            ))),
        }
    }
}
