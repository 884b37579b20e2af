//! High-level container operations

use std::path::Path;

use super::ProgressCallback;
use super::extractor::unpack_container;
use super::inspect::{ContainerInfo, inspect_container};
use super::repacker::{RepackOptions, repack_container};
use super::types::{RepackResult, UnpackResult};
use crate::config::LayoutConfig;
use crate::error::Result;

/// High-level RWS container operations.
pub struct RwsOperations;

impl RwsOperations {
    /// Unpack a container into a directory of block artifacts plus `manifest.json`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the container cannot be read or the output cannot be written.
    /// Returns [`Error::MalformedHeader`], [`Error::TruncatedInput`] or
    /// [`Error::CountOverflow`] if the container does not decode.
    ///
    /// [`Error::Io`]: crate::Error::Io
    /// [`Error::MalformedHeader`]: crate::Error::MalformedHeader
    /// [`Error::TruncatedInput`]: crate::Error::TruncatedInput
    /// [`Error::CountOverflow`]: crate::Error::CountOverflow
    pub fn unpack<P: AsRef<Path>>(
        container_path: P,
        output_dir: P,
        config: &LayoutConfig,
    ) -> Result<UnpackResult> {
        Self::unpack_with_progress(container_path, output_dir, config, &|_| {})
    }

    /// Unpack a container with progress callback
    ///
    /// Consistency warnings are logged and returned in the result; they never
    /// fail the unpack.
    ///
    /// # Errors
    ///
    /// Same as [`RwsOperations::unpack`]. No manifest is written on failure.
    pub fn unpack_with_progress<P: AsRef<Path>>(
        container_path: P,
        output_dir: P,
        config: &LayoutConfig,
        progress: ProgressCallback,
    ) -> Result<UnpackResult> {
        unpack_container(container_path.as_ref(), output_dir.as_ref(), config, progress)
    }

    /// Rebuild a container from an unpack directory
    ///
    /// Artifact sizes must match the manifest; use [`RwsOperations::repack_with_options`]
    /// to accept resized layers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactMissing`] if the manifest or an artifact is absent.
    /// Returns [`Error::ManifestMismatch`] if an artifact changed size.
    /// Returns [`Error::LayoutViolation`] if the planned layout does not fit the format.
    ///
    /// [`Error::ArtifactMissing`]: crate::Error::ArtifactMissing
    /// [`Error::ManifestMismatch`]: crate::Error::ManifestMismatch
    /// [`Error::LayoutViolation`]: crate::Error::LayoutViolation
    pub fn repack<P: AsRef<Path>>(input_dir: P, container_path: P) -> Result<RepackResult> {
        Self::repack_with_options(input_dir, container_path, &RepackOptions::default())
    }

    /// Rebuild a container, allowing resized artifacts or a different alignment
    ///
    /// # Errors
    ///
    /// Same as [`RwsOperations::repack`].
    pub fn repack_with_options<P: AsRef<Path>>(
        input_dir: P,
        container_path: P,
        options: &RepackOptions,
    ) -> Result<RepackResult> {
        Self::repack_with_progress(input_dir, container_path, options, &|_| {})
    }

    /// Rebuild a container with progress callback
    ///
    /// The target is written through a temporary file and replaced only
    /// after every byte was written, so it is untouched on failure.
    ///
    /// # Errors
    ///
    /// Same as [`RwsOperations::repack`].
    pub fn repack_with_progress<P: AsRef<Path>>(
        input_dir: P,
        container_path: P,
        options: &RepackOptions,
        progress: ProgressCallback,
    ) -> Result<RepackResult> {
        repack_container(input_dir.as_ref(), container_path.as_ref(), options, progress)
    }

    /// Decode a container and summarize it without extracting
    ///
    /// # Errors
    ///
    /// Same decode errors as [`RwsOperations::unpack`].
    pub fn inspect<P: AsRef<Path>>(container_path: P, config: &LayoutConfig) -> Result<ContainerInfo> {
        inspect_container(container_path.as_ref(), config)
    }
}
