//! Batch container operations
//!
//! Containers share no state, so each one is unpacked on its own rayon task.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use super::RwsOperations;
use super::types::{RwsPhase, RwsProgress};
use crate::config::LayoutConfig;

/// Result of a batch operation
#[derive(Debug, Clone)]
pub struct BatchUnpackResult {
    /// Number of successful operations
    pub success_count: usize,
    /// Number of failed operations
    pub fail_count: usize,
    /// Messages for each file processed
    pub results: Vec<String>,
}

/// Find all .rws files in a directory recursively
///
/// # Returns
/// A sorted list of paths to .rws files found in the directory tree.
pub fn find_rws_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut rws_files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("rws"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    rws_files.sort();
    rws_files
}

/// Unpack many containers in parallel
///
/// Each container is unpacked into a subdirectory of `dest_base` named after
/// the file, mirroring its position under `source_base`.
///
/// # Arguments
/// * `rws_files` - Containers to unpack
/// * `source_base` - Base directory of the source (for calculating relative paths)
/// * `dest_base` - Destination directory
/// * `config` - Alignment used for every container
/// * `progress` - Callback for progress updates
pub fn batch_unpack<F>(
    rws_files: &[PathBuf],
    source_base: &Path,
    dest_base: &Path,
    config: &LayoutConfig,
    progress: F,
) -> BatchUnpackResult
where
    F: Fn(&RwsProgress) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = rws_files.len();

    let results: Vec<String> = rws_files
        .par_iter()
        .map(|rws_path| {
            let relative_path = rws_path
                .strip_prefix(source_base)
                .unwrap_or(rws_path.as_path());
            let display_path = relative_path.to_string_lossy();

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&RwsProgress::with_file(
                RwsPhase::ExtractingLayers,
                current,
                total,
                display_path.to_string(),
            ));

            let relative_parent = relative_path.parent().unwrap_or(Path::new(""));
            let stem = rws_path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let dest = dest_base.join(relative_parent).join(&stem);

            match RwsOperations::unpack(rws_path.as_path(), dest.as_path(), config) {
                Ok(result) if result.warnings.is_empty() => {
                    success_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Unpacked: {display_path}")
                }
                Ok(result) => {
                    success_counter.fetch_add(1, Ordering::SeqCst);
                    format!(
                        "Unpacked: {display_path} ({} consistency warning(s))",
                        result.warnings.len()
                    )
                }
                Err(e) => {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Failed {display_path}: {e}")
                }
            }
        })
        .collect();

    tracing::info!(
        "Batch unpack: {} succeeded, {} failed",
        success_counter.load(Ordering::SeqCst),
        fail_counter.load(Ordering::SeqCst)
    );

    BatchUnpackResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        results,
    }
}
