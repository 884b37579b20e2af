//! Error types for `RwsKit`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `RwsKit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact named by a manifest does not exist on disk.
    #[error("artifact file not found: {path}")]
    ArtifactMissing {
        /// The expected path to the artifact.
        path: PathBuf,
    },

    // ==================== Container Structure Errors ====================
    /// Fewer bytes remain than a declared structure requires.
    #[error("truncated input at offset {offset:#x}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        /// Absolute offset where the structure starts.
        offset: u64,
        /// Number of bytes the structure declares.
        needed: u64,
        /// Number of bytes actually available.
        available: u64,
    },

    /// An identifier or fixed-field constraint is violated.
    #[error("malformed header at offset {offset:#x}: {reason}")]
    MalformedHeader {
        /// Absolute offset of the offending structure.
        offset: u64,
        /// Description of the violated constraint.
        reason: String,
    },

    /// A record table declares more records than the header chunk can hold.
    #[error(
        "{table} table at offset {offset:#x} declares {count} records of {record_size} bytes, \
         only {available} bytes remain"
    )]
    CountOverflow {
        /// Name of the table being decoded.
        table: &'static str,
        /// Absolute offset of the table.
        offset: u64,
        /// Declared record count.
        count: u64,
        /// Size of one record in bytes.
        record_size: u64,
        /// Bytes remaining in the header chunk.
        available: u64,
    },

    // ==================== Repack Errors ====================
    /// A computed offset or size cannot be represented in the container.
    #[error("layout violation at {location}: {reason}")]
    LayoutViolation {
        /// Segment and layer the violation was found in.
        location: String,
        /// Description of the violation.
        reason: String,
    },

    /// An artifact's size differs from the size recorded in the manifest.
    #[error(
        "artifact {artifact} is {actual} bytes but the manifest records {expected}; \
         pass a resize override to accept the new size"
    )]
    ManifestMismatch {
        /// Artifact file name.
        artifact: String,
        /// Size recorded in the manifest.
        expected: u64,
        /// Size found on disk.
        actual: u64,
    },

    /// The manifest cannot describe a valid container.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    // ==================== Configuration Errors ====================
    /// Layout configuration is unusable (zero alignment, unknown profile).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Path contains invalid characters or escapes its directory.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    // ==================== Serialization Errors ====================
    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Short name of the failure kind, used in one-line diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::ArtifactMissing { .. } => "IOError",
            Self::TruncatedInput { .. } => "TruncatedInput",
            Self::MalformedHeader { .. } => "MalformedHeader",
            Self::CountOverflow { .. } => "CountOverflow",
            Self::LayoutViolation { .. } => "LayoutViolation",
            Self::ManifestMismatch { .. } | Self::InvalidManifest(_) => "ManifestMismatch",
            Self::InvalidConfig(_) | Self::Toml(_) => "InvalidConfig",
            Self::InvalidPath(_) => "InvalidPath",
            Self::Json(_) => "ManifestMismatch",
        }
    }

    /// Build a [`Error::TruncatedInput`].
    pub(crate) fn truncated(offset: u64, needed: u64, available: u64) -> Self {
        Self::TruncatedInput {
            offset,
            needed,
            available,
        }
    }

    /// Build a [`Error::MalformedHeader`].
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Build a [`Error::LayoutViolation`].
    pub(crate) fn layout(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LayoutViolation {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for `RwsKit` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names() {
        assert_eq!(Error::truncated(0, 12, 3).kind(), "TruncatedInput");
        assert_eq!(Error::malformed(0, "bad id").kind(), "MalformedHeader");
        assert_eq!(
            Error::layout("segment 0", "offset overflow").kind(),
            "LayoutViolation"
        );
        assert_eq!(
            Error::InvalidConfig("zero alignment".into()).kind(),
            "InvalidConfig"
        );
    }

    #[test]
    fn test_truncated_message_names_offset() {
        let msg = Error::truncated(0x40, 16, 4).to_string();
        assert!(msg.contains("0x40"), "{msg}");
        assert!(msg.contains("needed 16"), "{msg}");
    }
}
