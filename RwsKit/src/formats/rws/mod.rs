//! RenderWare audio stream (RWS) container format
//!
//! An RWS file is a chain of little-endian chunks. The outer container chunk
//! holds exactly one audio-header chunk followed by one audio-data chunk:
//!
//! ```text
//! [container 0x80D]
//!   [header 0x80E]  base header, name, segment/layer tables
//!   [data   0x80F]  prefix | segment 0 | segment 1 | ... | tail
//! ```
//!
//! The layer records are shared by every segment: each segment holds one
//! block per layer at the offsets the layer records give. Blocks hold
//! opaque codec payloads padded to the layer alignment; segments are padded
//! to the segment alignment. The usable-size table has one entry per
//! (segment, layer) pair.

mod chunk;
mod codec;
mod container;
mod header;
mod layout;
mod tables;

pub use chunk::{Chunk, ChunkHeader, ChunkReader};
pub use codec::{CodecId, CodecKind};
pub use container::{ChunkVersions, RwsContainer, total_container_size};
pub use header::AudioHeader;
pub use layout::{ConsistencyWarning, LayerLayout, Layout, LayoutField, SegmentLayout};
pub use tables::{
    DspInfo, HeaderTables, LayerConfig, LayerConfigEntry, LayerInfo, SegmentRecord, TableDecoder,
};

/// Chunk id of the outer container
pub const CONTAINER_ID: u32 = 0x0000_080D;
/// Chunk id of the audio header
pub const HEADER_CHUNK_ID: u32 = 0x0000_080E;
/// Chunk id of the audio data
pub const DATA_CHUNK_ID: u32 = 0x0000_080F;

/// Size of a chunk header (id, size, version)
pub const CHUNK_HEADER_SIZE: u64 = 12;

/// Fixed part of the audio header preceding the name
pub const BASE_HEADER_SIZE: usize = 0x50;
/// Size of one segment record
pub const SEGMENT_RECORD_SIZE: usize = 0x20;
/// Size of one usable-size table entry
pub const USABLE_SIZE_ENTRY_SIZE: usize = 4;
/// Size of a segment or container identity
pub const IDENTITY_SIZE: usize = 16;
/// Size of one layer info record
pub const LAYER_INFO_SIZE: usize = 0x28;
/// Size of one layer config record, excluding the optional DSP record and trailer
pub const LAYER_CONFIG_SIZE: usize = 0x2C;
/// Size of the DSP ADPCM record following a DSP layer config
pub const DSP_INFO_SIZE: usize = 0x60;
/// Opaque word closing every layer config entry
pub const LAYER_CONFIG_TRAILER_SIZE: usize = 4;

/// Codec tag (first word of the codec id) for GameCube/Wii DSP ADPCM
pub const DSP_CODEC_TAG: u32 = 0xF86215B0;
