//! Utility functions

pub mod binary;
pub mod encoding;
pub mod io;
pub mod path;

pub use binary::{padded_string_len, round_up, string_from_padded};
pub use io::{copy_exact, write_atomically, write_zeros};
pub use path::{artifact_stem, sanitize_file_name};
