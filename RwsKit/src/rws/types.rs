//! Progress reporting and result types for container operations

use std::path::PathBuf;

use crate::config::LayoutConfig;
use crate::formats::rws::ConsistencyWarning;

/// Progress update passed to callbacks
#[derive(Debug, Clone)]
pub struct RwsProgress {
    /// Current operation phase
    pub phase: RwsPhase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Current artifact being processed (if applicable)
    pub current_file: Option<String>,
}

impl RwsProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: RwsPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with a file/item name
    #[must_use]
    pub fn with_file(phase: RwsPhase, current: usize, total: usize, file: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of a container or bundle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwsPhase {
    /// Reading chunk headers and the audio header
    ReadingHeader,
    /// Running the layout planner
    PlanningLayout,
    /// Copying layer payloads out of the data region
    ExtractingLayers,
    /// Copying assets out of a stream bundle
    ExtractingAssets,
    /// Writing manifest.json
    WritingManifest,
    /// Reading manifest.json
    ReadingManifest,
    /// Checking artifact sizes against the manifest
    ValidatingArtifacts,
    /// Writing the rebuilt container or bundle
    WritingContainer,
    /// Operation complete
    Complete,
}

impl RwsPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadingHeader => "Reading header",
            Self::PlanningLayout => "Planning layout",
            Self::ExtractingLayers => "Extracting layers",
            Self::ExtractingAssets => "Extracting assets",
            Self::WritingManifest => "Writing manifest",
            Self::ReadingManifest => "Reading manifest",
            Self::ValidatingArtifacts => "Validating artifacts",
            Self::WritingContainer => "Writing container",
            Self::Complete => "Complete",
        }
    }
}

/// Outcome of unpacking one container
#[derive(Debug, Clone)]
pub struct UnpackResult {
    pub manifest_path: PathBuf,
    /// Block artifacts written, one per segment and layer (prefix and tail not counted)
    pub artifact_count: usize,
    /// Total payload bytes copied
    pub bytes_extracted: u64,
    /// Stored offsets that disagree with the layout planner
    pub warnings: Vec<ConsistencyWarning>,
}

/// Outcome of repacking one container
#[derive(Debug, Clone)]
pub struct RepackResult {
    pub output: PathBuf,
    pub bytes_written: u64,
    /// Artifacts whose recorded block size was replaced by their on-disk size
    pub resized: Vec<String>,
    /// Alignment the layout was planned with
    pub layout: LayoutConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        assert!((RwsProgress::new(RwsPhase::ExtractingLayers, 1, 4).percentage() - 0.25).abs() < f32::EPSILON);
        assert!((RwsProgress::new(RwsPhase::Complete, 0, 0).percentage() - 1.0).abs() < f32::EPSILON);
        let p = RwsProgress::with_file(RwsPhase::WritingContainer, 2, 3, "x_s000_l00.raw");
        assert_eq!(p.current_file.as_deref(), Some("x_s000_l00.raw"));
        assert_eq!(p.phase.as_str(), "Writing container");
    }
}
