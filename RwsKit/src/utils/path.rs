//! Path utilities

use crate::error::{Error, Result};

/// Reduce a container name to `[A-Za-z0-9_-]`, for use as an artifact file stem.
///
/// A trailing extension is dropped and every other character becomes `_`.
/// An empty result falls back to `stream`.
#[must_use]
pub fn artifact_stem(name: &str) -> String {
    let base = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    let stem: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "stream".to_string()
    } else {
        stem
    }
}

/// Make an embedded asset name safe to use as a single file name.
///
/// Path separators and control characters become `_`; dots are kept so
/// extensions survive.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Check that a manifest-supplied artifact name is a plain file name.
///
/// # Errors
/// Returns [`Error::InvalidPath`] for empty names, separators, or parent references.
pub fn validate_artifact_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(Error::InvalidPath(format!(
            "artifact name {name:?} must be a plain file name"
        )));
    }
    Ok(())
}
