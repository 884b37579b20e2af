//! `.stream` bundles
//!
//! A bundle is a flat run of sections with the usual `id, size, version`
//! header and no outer container. Sections with id [`STREAM_SECTION_ID`]
//! wrap one named asset (see [`AssetHeader`]); all others are kept raw.

mod asset;
pub mod manifest;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

pub use asset::{AssetHeader, asset_file_name, raw_file_name};
pub use manifest::{AssetEntry, STREAM_MANIFEST_VERSION, SectionEntry, StreamManifest};

use crate::error::Result;
use crate::rws::ProgressCallback;

/// Section id of a wrapped asset
pub const STREAM_SECTION_ID: u32 = 0x0000_0716;

/// Outcome of unpacking a bundle
#[derive(Debug, Clone)]
pub struct StreamUnpackResult {
    pub manifest_path: PathBuf,
    pub section_count: usize,
    /// Sections that wrapped a named asset
    pub asset_count: usize,
    pub bytes_extracted: u64,
}

/// Outcome of repacking a bundle
#[derive(Debug, Clone)]
pub struct StreamRepackResult {
    pub output: PathBuf,
    pub bytes_written: u64,
    pub section_count: usize,
}

/// High-level stream bundle operations.
pub struct StreamOperations;

impl StreamOperations {
    /// Split a bundle into one file per section plus `manifest.json`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedInput`] if a section or asset runs past its container,
    /// [`Error::MalformedHeader`] if an asset header is inconsistent, and
    /// [`Error::Io`] on filesystem failures.
    ///
    /// [`Error::TruncatedInput`]: crate::Error::TruncatedInput
    /// [`Error::MalformedHeader`]: crate::Error::MalformedHeader
    /// [`Error::Io`]: crate::Error::Io
    pub fn unpack<P: AsRef<Path>>(stream_path: P, output_dir: P) -> Result<StreamUnpackResult> {
        Self::unpack_with_progress(stream_path, output_dir, &|_| {})
    }

    /// Split a bundle with progress callback
    ///
    /// # Errors
    ///
    /// Same as [`StreamOperations::unpack`].
    pub fn unpack_with_progress<P: AsRef<Path>>(
        stream_path: P,
        output_dir: P,
        progress: ProgressCallback,
    ) -> Result<StreamUnpackResult> {
        reader::unpack_stream(stream_path.as_ref(), output_dir.as_ref(), progress)
    }

    /// Rebuild a bundle from an unpack directory
    ///
    /// Section, header and file sizes are recomputed, so edited files may
    /// change size freely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactMissing`] if the manifest or a section file is absent
    /// and [`Error::LayoutViolation`] if a size no longer fits in 32 bits.
    ///
    /// [`Error::ArtifactMissing`]: crate::Error::ArtifactMissing
    /// [`Error::LayoutViolation`]: crate::Error::LayoutViolation
    pub fn repack<P: AsRef<Path>>(input_dir: P, stream_path: P) -> Result<StreamRepackResult> {
        Self::repack_with_progress(input_dir, stream_path, &|_| {})
    }

    /// Rebuild a bundle with progress callback
    ///
    /// # Errors
    ///
    /// Same as [`StreamOperations::repack`].
    pub fn repack_with_progress<P: AsRef<Path>>(
        input_dir: P,
        stream_path: P,
        progress: ProgressCallback,
    ) -> Result<StreamRepackResult> {
        writer::repack_stream(input_dir.as_ref(), stream_path.as_ref(), progress)
    }
}
