use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::config::{ConfigFile, LayoutConfig};

pub mod batch;
pub mod info;
pub mod repack;
pub mod stream;
pub mod unpack;

/// Alignment selection shared by the container commands
#[derive(Args, Debug, Clone, Default)]
pub struct LayoutArgs {
    /// Layout profile file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to use from the config file (default: its `default_profile`)
    #[arg(long, requires = "config")]
    pub profile: Option<String>,

    /// Pad every layer block to a multiple of this
    #[arg(long)]
    pub layer_alignment: Option<u32>,

    /// Pad every segment start and size to a multiple of this
    #[arg(long)]
    pub segment_alignment: Option<u32>,
}

impl LayoutArgs {
    /// Whether any layout flag was given
    pub fn is_set(&self) -> bool {
        self.config.is_some() || self.layer_alignment.is_some() || self.segment_alignment.is_some()
    }

    /// Resolve the alignment, starting from `fallback` when no profile file is given
    pub fn resolve_over(&self, fallback: LayoutConfig) -> anyhow::Result<LayoutConfig> {
        let base = match &self.config {
            Some(path) => ConfigFile::load(path)?.profile(self.profile.as_deref())?,
            None => fallback,
        };
        let config = base.with_overrides(self.layer_alignment, self.segment_alignment);
        config.validate()?;
        Ok(config)
    }

    /// Resolve the alignment, defaulting to no padding
    pub fn resolve(&self) -> anyhow::Result<LayoutConfig> {
        self.resolve_over(LayoutConfig::NEUTRAL)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Unpack an RWS container into one file per segment and layer plus manifest.json
    Unpack {
        /// Source RWS container
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory
        #[arg(short, long)]
        destination: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Rebuild an RWS container from an unpack directory
    Repack {
        /// Unpack directory containing manifest.json
        #[arg(short, long)]
        source: PathBuf,

        /// Output RWS container
        #[arg(short, long)]
        destination: PathBuf,

        /// Accept a new size for this block file (repeatable)
        #[arg(long, value_name = "ARTIFACT")]
        resize: Vec<String>,

        /// Accept new sizes for every block file
        #[arg(long, conflicts_with = "resize")]
        resize_all: bool,

        /// Alignment override (default: the alignment recorded at unpack time)
        #[command(flatten)]
        layout: LayoutArgs,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show header, segment and layer details of an RWS container
    Info {
        /// RWS container
        #[arg(short, long)]
        source: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Unpack every .rws file under a directory
    BatchUnpack {
        /// Directory to search
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory; each container gets its own subdirectory
        #[arg(short, long)]
        destination: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Split a .stream bundle into one file per section
    StreamUnpack {
        /// Source .stream bundle
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory
        #[arg(short, long)]
        destination: PathBuf,
    },

    /// Rebuild a .stream bundle from a stream-unpack directory
    StreamRepack {
        /// Unpack directory containing manifest.json
        #[arg(short, long)]
        source: PathBuf,

        /// Output .stream bundle
        #[arg(short, long)]
        destination: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Unpack {
                source,
                destination,
                layout,
                quiet,
            } => unpack::execute(source, destination, layout, !*quiet),
            Commands::Repack {
                source,
                destination,
                resize,
                resize_all,
                layout,
                quiet,
            } => repack::execute(source, destination, resize, *resize_all, layout, !*quiet),
            Commands::Info {
                source,
                json,
                layout,
            } => info::execute(source, *json, layout),
            Commands::BatchUnpack {
                source,
                destination,
                layout,
            } => batch::execute(source, destination, layout),
            Commands::StreamUnpack {
                source,
                destination,
            } => stream::unpack(source, destination),
            Commands::StreamRepack {
                source,
                destination,
            } => stream::repack(source, destination),
        }
    }
}
