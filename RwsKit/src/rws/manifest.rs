//! `manifest.json`: everything needed to rebuild a container from its artifacts

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::formats::rws::{DspInfo, LayerConfig};
use crate::utils::encoding::{base64_array, base64_opt, base64_vec};
use crate::utils::write_atomically;

/// File name of the manifest inside an unpack directory
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Current manifest schema version
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Sidecar metadata written next to the extracted artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    /// File name of the container this was unpacked from
    pub source_file: String,
    /// Alignment used when unpacking
    pub layout: LayoutConfig,
    pub container: ContainerEntry,
    pub segments: Vec<SegmentEntry>,
    /// Layer records shared by every segment, in table order
    pub layers: Vec<LayerEntry>,
    /// Artifact file name to the block it holds, segment by segment
    pub artifacts: IndexMap<String, ArtifactEntry>,
    /// Artifact holding the data region bytes before the first segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Artifact holding the data region bytes after the last segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<String>,
}

/// Header fields that are not derived from the layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEntry {
    pub container_version: u32,
    pub header_version: u32,
    pub data_version: u32,
    #[serde(with = "base64_array")]
    pub leading: [u8; 0x20],
    #[serde(with = "base64_array")]
    pub unknown_24: [u8; 4],
    #[serde(with = "base64_array")]
    pub unknown_2c: [u8; 8],
    #[serde(with = "base64_array")]
    pub unknown_3c: [u8; 4],
    pub identity: Uuid,
    /// Decoded name, informational only
    pub name: String,
    #[serde(with = "base64_vec")]
    pub name_raw: Vec<u8>,
    pub data_offset: u32,
    pub usable_sizes: Vec<u32>,
    #[serde(with = "base64_vec")]
    pub header_tail: Vec<u8>,
}

/// Non-derived parts of one segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub index: usize,
    #[serde(with = "base64_array")]
    pub record: [u8; 0x18],
    pub identity: Uuid,
    pub name: String,
    #[serde(with = "base64_vec")]
    pub name_raw: Vec<u8>,
    /// Segment padding, kept only when non-zero
    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    pub padding: Option<Vec<u8>>,
}

/// Non-derived parts of one layer-info record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfoEntry {
    #[serde(with = "base64_array")]
    pub opaque_00: [u8; 0x10],
    #[serde(with = "base64_array")]
    pub opaque_14: [u8; 4],
    pub interleave: u16,
    pub frame_size: u16,
    #[serde(with = "base64_array")]
    pub opaque_1c: [u8; 4],
}

/// One layer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub index: usize,
    pub info: LayerInfoEntry,
    pub config: LayerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsp: Option<DspInfo>,
    #[serde(with = "base64_array")]
    pub trailer: [u8; 4],
    /// Unpadded block size at unpack time, the length of each of its artifacts
    pub block_size: u32,
}

/// One extracted block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub segment: usize,
    pub layer: usize,
    /// Layer padding after this block, kept only when non-zero
    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    pub padding: Option<Vec<u8>>,
}

impl Manifest {
    /// Path of the manifest inside `dir`
    #[must_use]
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE_NAME)
    }

    /// Artifact file name for a layer
    #[must_use]
    pub fn artifact_name(stem: &str, segment: usize, layer: usize) -> String {
        format!("{stem}_s{segment:03}_l{layer:02}.raw")
    }

    /// Load and version-check the manifest in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if !path.is_file() {
            return Err(Error::ArtifactMissing { path });
        }
        let text = std::fs::read_to_string(&path)?;
        let manifest: Self = serde_json::from_str(&text)?;
        if manifest.format_version != MANIFEST_FORMAT_VERSION {
            return Err(Error::InvalidManifest(format!(
                "unsupported manifest format_version {} (expected {MANIFEST_FORMAT_VERSION})",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }

    /// Write the manifest into `dir` atomically
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(dir);
        let json = serde_json::to_string_pretty(self)?;
        write_atomically(&path, |w| {
            w.write_all(json.as_bytes())?;
            w.write_all(b"\n")?;
            Ok(())
        })?;
        Ok(path)
    }

    /// Arrange artifacts by segment and layer, checking indices are complete
    ///
    /// # Errors
    /// Returns [`Error::InvalidManifest`] if segment or layer entries are out
    /// of order, an artifact lies outside the segment x layer grid, two
    /// artifacts fill the same block, or a block has no artifact.
    pub fn artifact_grid(&self) -> Result<Vec<Vec<(&str, &ArtifactEntry)>>> {
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.index != i {
                return Err(Error::InvalidManifest(format!(
                    "segment entry {i} has index {}",
                    segment.index
                )));
            }
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.index != i {
                return Err(Error::InvalidManifest(format!(
                    "layer entry {i} has index {}",
                    layer.index
                )));
            }
        }

        let (segment_count, layer_count) = (self.segments.len(), self.layers.len());
        let mut grid: Vec<Vec<Option<(&str, &ArtifactEntry)>>> =
            vec![vec![None; layer_count]; segment_count];
        for (name, entry) in &self.artifacts {
            let slot = grid
                .get_mut(entry.segment)
                .and_then(|row| row.get_mut(entry.layer))
                .ok_or_else(|| {
                    Error::InvalidManifest(format!(
                        "artifact {name} refers to segment {} layer {}, outside {segment_count} segment(s) x {layer_count} layer(s)",
                        entry.segment, entry.layer
                    ))
                })?;
            if let Some((other, _)) = slot {
                return Err(Error::InvalidManifest(format!(
                    "artifacts {other} and {name} both hold segment {} layer {}",
                    entry.segment, entry.layer
                )));
            }
            *slot = Some((name.as_str(), entry));
        }

        grid.into_iter()
            .enumerate()
            .map(|(s, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(l, slot)| {
                        slot.ok_or_else(|| {
                            Error::InvalidManifest(format!("no artifact for segment {s} layer {l}"))
                        })
                    })
                    .collect()
            })
            .collect()
    }
}
