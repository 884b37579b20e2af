//! Container unpack/repack operations

mod batch;
mod extractor;
mod inspect;
pub mod manifest;
mod operations;
mod repacker;
mod types;

pub use batch::{BatchUnpackResult, batch_unpack, find_rws_files};
pub use inspect::{ContainerInfo, LayerSummary, SegmentInfo};
pub use manifest::{
    ArtifactEntry, ContainerEntry, LayerEntry, LayerInfoEntry, MANIFEST_FILE_NAME,
    MANIFEST_FORMAT_VERSION,
    Manifest, SegmentEntry,
};
pub use operations::RwsOperations;
pub use repacker::RepackOptions;
pub use types::{RepackResult, RwsPhase, RwsProgress, UnpackResult};

/// Progress callback for container and bundle operations.
///
/// Receives a [`RwsProgress`] struct with phase, current/total counts, and optional filename.
/// Must be `Sync + Send` so batch operations can share it across threads.
///
/// # Example
/// ```ignore
/// use rwskit::rws::{RwsOperations, RwsPhase};
///
/// RwsOperations::unpack_with_progress(rws, dest, &config, &|progress| {
///     if progress.phase == RwsPhase::ExtractingLayers {
///         println!("{}/{}: {:?}", progress.current, progress.total, progress.current_file);
///     }
/// })?;
/// ```
pub type ProgressCallback<'a> = &'a (dyn Fn(&RwsProgress) + Sync + Send);
