//! `manifest.json` for an unpacked stream bundle

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::AssetHeader;
use crate::error::{Error, Result};
use crate::rws::MANIFEST_FILE_NAME;
use crate::utils::encoding::base64_vec;
use crate::utils::write_atomically;

/// Current stream manifest schema version
pub const STREAM_MANIFEST_VERSION: u32 = 1;

/// Sections of a bundle, in file order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamManifest {
    pub format_version: u32,
    pub source_file: String,
    pub sections: Vec<SectionEntry>,
}

/// One section and the file holding its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    /// 1-based position in the bundle
    pub index: usize,
    pub file_name: String,
    pub section_id: u32,
    pub version: u32,
    /// Present for sections wrapping a named asset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetEntry>,
}

/// Wrapped-asset fields that are not recomputed on repack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Decoded name, informational only
    pub name: String,
    #[serde(with = "base64_vec")]
    pub name_raw: Vec<u8>,
    pub identity: Uuid,
    /// Decoded kind, informational only
    pub kind: String,
    #[serde(with = "base64_vec")]
    pub kind_raw: Vec<u8>,
    #[serde(with = "base64_vec")]
    pub header_rest: Vec<u8>,
    #[serde(with = "base64_vec")]
    pub trailing: Vec<u8>,
}

impl AssetEntry {
    pub(crate) fn new(header: AssetHeader, trailing: Vec<u8>) -> Self {
        Self {
            name: header.name(),
            kind: header.kind(),
            name_raw: header.name_raw,
            identity: header.identity,
            kind_raw: header.kind_raw,
            header_rest: header.rest,
            trailing,
        }
    }

    pub(crate) fn header(&self) -> AssetHeader {
        AssetHeader {
            name_raw: self.name_raw.clone(),
            identity: self.identity,
            kind_raw: self.kind_raw.clone(),
            rest: self.header_rest.clone(),
        }
    }
}

impl StreamManifest {
    /// Load and version-check the manifest in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Err(Error::ArtifactMissing { path });
        }
        let text = std::fs::read_to_string(&path)?;
        let manifest: Self = serde_json::from_str(&text)?;
        if manifest.format_version != STREAM_MANIFEST_VERSION {
            return Err(Error::InvalidManifest(format!(
                "unsupported stream manifest format_version {} (expected {STREAM_MANIFEST_VERSION})",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }

    /// Write the manifest into `dir` atomically
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        write_atomically(&path, |w| {
            w.write_all(json.as_bytes())?;
            w.write_all(b"\n")?;
            Ok(())
        })?;
        Ok(path)
    }
}
