//! # RwsKit
//!
//! A pure-Rust library for RenderWare audio stream (RWS) containers and
//! `.stream` asset bundles.
//!
//! ## Supported Formats
//!
//! - **RWS containers** - Unpack layers to raw files, inspect, and repack
//!   byte-identically or with resized layers
//! - **Stream bundles** - Split into sections and rebuild
//!
//! ## Quick Start
//!
//! ```no_run
//! use rwskit::config::LayoutConfig;
//! use rwskit::rws::{RepackOptions, RwsOperations};
//!
//! let config = LayoutConfig::new(2048, 2048);
//!
//! // Unpack every segment/layer block plus manifest.json
//! let result = RwsOperations::unpack("Music.rws", "music/", &config)?;
//! for warning in &result.warnings {
//!     eprintln!("{warning}");
//! }
//!
//! // Rebuild, accepting an edited block of a different size
//! let mut options = RepackOptions::default();
//! options.resize.insert("Music_s000_l00.raw".to_string());
//! RwsOperations::repack_with_options("music/", "Music_new.rws", &options)?;
//! # Ok::<(), rwskit::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `rwskit` command-line binary

pub mod config;
pub mod error;
pub mod formats;
pub mod rws;
pub mod stream;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{ConfigFile, LayoutConfig};
    pub use crate::error::{Error, Result};
    pub use crate::formats::rws::{CodecKind, ConsistencyWarning, Layout, RwsContainer};

    pub use crate::rws::{
        BatchUnpackResult, ContainerInfo, Manifest, RepackOptions, RwsOperations, RwsPhase,
        RwsProgress, batch_unpack, find_rws_files,
    };
    pub use crate::stream::{StreamManifest, StreamOperations};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
