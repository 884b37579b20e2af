//! Layout planner: derives every block, layer and segment offset
//!
//! The planner is a pure function of the ordered block sizes and the
//! alignment constants. Unpack compares its output with the stored tables
//! and reports differences as [`ConsistencyWarning`]s; repack writes its
//! output verbatim.

use std::fmt;

use super::{AudioHeader, HeaderTables};
use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::utils::round_up;

/// Derived placement of one layer inside every segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerLayout {
    pub block_size: u32,
    pub block_size_pad: u32,
    pub layer_start: u32,
}

impl LayerLayout {
    /// Offset one past the padded block, relative to the segment
    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.layer_start) + u64::from(self.block_size_pad)
    }

    /// Bytes of layer padding after the payload
    #[must_use]
    pub fn padding_len(&self) -> u64 {
        u64::from(self.block_size_pad.saturating_sub(self.block_size))
    }
}

/// Derived placement of one segment inside the data region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub layers_size: u32,
    /// Relative to the header's data offset
    pub data_offset: u32,
}

impl SegmentLayout {
    /// Offset one past the segment, relative to the header's data offset
    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.data_offset) + u64::from(self.layers_size)
    }
}

/// Field compared by the consistency check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutField {
    BlockSizePad,
    LayerStart,
    LayersSize,
    SegmentDataOffset,
    BlockLayersSize,
}

impl LayoutField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlockSizePad => "block_size_pad",
            Self::LayerStart => "layer_start",
            Self::LayersSize => "layers_size",
            Self::SegmentDataOffset => "segment data_offset",
            Self::BlockLayersSize => "block_layers_size",
        }
    }
}

/// A stored offset or size that disagrees with the planner
///
/// Never fatal: unpack extracts with the stored values and reports these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    pub field: LayoutField,
    /// Set for segment records
    pub segment: Option<usize>,
    /// Set for layer records
    pub layer: Option<usize>,
    pub stored: u64,
    pub computed: u64,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.segment, self.layer) {
            (Some(s), Some(l)) => write!(f, "segment {s} layer {l}: ")?,
            (Some(s), None) => write!(f, "segment {s}: ")?,
            (None, Some(l)) => write!(f, "layer {l}: ")?,
            (None, None) => write!(f, "header: ")?,
        }
        write!(
            f,
            "stored {} is {} but the layout computes {}",
            self.field.as_str(),
            self.stored,
            self.computed
        )
    }
}

/// Placement of every layer and segment
///
/// Layer records are shared: every segment holds one block per layer at the
/// same relative offsets, so a segment spans the padded blocks of all layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub layers: Vec<LayerLayout>,
    pub segments: Vec<SegmentLayout>,
    /// Sum of every layer's padded block size
    pub block_layers_size: u32,
}

fn to_u32(value: u64, location: impl FnOnce() -> String, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::layout(
            location(),
            format!("{what} {value} does not fit in 32 bits"),
        )
    })
}

impl Layout {
    /// Compute every derived offset from the ordered layer block sizes
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for zero alignments and
    /// [`Error::LayoutViolation`] when any value overflows its 32-bit field.
    pub fn plan(block_sizes: &[u32], segment_count: usize, config: &LayoutConfig) -> Result<Self> {
        config.validate()?;
        let layer_alignment = u64::from(config.layer_alignment);
        let segment_alignment = u64::from(config.segment_alignment);

        let mut layers = Vec::with_capacity(block_sizes.len());
        let mut start = 0u64;
        for (l, &block_size) in block_sizes.iter().enumerate() {
            let location = || format!("layer {l}");
            let pad = round_up(u64::from(block_size), layer_alignment)
                .ok_or_else(|| Error::layout(location(), "offset overflow"))?;
            layers.push(LayerLayout {
                block_size,
                block_size_pad: to_u32(pad, location, "padded block size")?,
                layer_start: to_u32(start, location, "layer start")?,
            });
            start += pad;
        }
        let block_layers_size = to_u32(start, || "header".to_string(), "block_layers_size")?;

        let mut segments = Vec::with_capacity(segment_count);
        let mut cursor = 0u64;
        for s in 0..segment_count {
            let location = || format!("segment {s}");
            let overflow = || Error::layout(location(), "offset overflow");
            let data_offset = round_up(cursor, segment_alignment).ok_or_else(overflow)?;
            let layers_size = round_up(start, segment_alignment).ok_or_else(overflow)?;
            segments.push(SegmentLayout {
                layers_size: to_u32(layers_size, location, "segment size")?,
                data_offset: to_u32(data_offset, location, "segment offset")?,
            });
            cursor = data_offset + layers_size;
        }

        let layout = Self {
            layers,
            segments,
            block_layers_size,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Read the layout as stored in a container's tables
    #[must_use]
    pub fn from_tables(header: &AudioHeader, tables: &HeaderTables) -> Self {
        Self {
            layers: tables
                .layer_infos
                .iter()
                .map(|info| LayerLayout {
                    block_size: info.block_size,
                    block_size_pad: info.block_size_pad,
                    layer_start: info.layer_start,
                })
                .collect(),
            segments: tables
                .segments
                .iter()
                .map(|record| SegmentLayout {
                    layers_size: record.layers_size,
                    data_offset: record.data_offset,
                })
                .collect(),
            block_layers_size: header.block_layers_size,
        }
    }

    /// Ordered layer block sizes
    #[must_use]
    pub fn block_sizes(&self) -> Vec<u32> {
        self.layers.iter().map(|l| l.block_size).collect()
    }

    /// Furthest padded layer end, relative to a segment
    #[must_use]
    pub fn layers_end(&self) -> u64 {
        self.layers.iter().map(LayerLayout::end).max().unwrap_or(0)
    }

    /// Bytes between the last padded layer and the end of `segment`
    #[must_use]
    pub fn segment_padding_len(&self, segment: &SegmentLayout) -> u64 {
        u64::from(segment.layers_size).saturating_sub(self.layers_end())
    }

    /// Offset one past the furthest segment, relative to the header's data offset
    #[must_use]
    pub fn segments_end(&self) -> u64 {
        self.segments.iter().map(SegmentLayout::end).max().unwrap_or(0)
    }

    /// Check that no block exceeds its padding and nothing overlaps
    ///
    /// # Errors
    /// Returns [`Error::LayoutViolation`] naming the first offending layer or segment.
    pub fn validate(&self) -> Result<()> {
        let mut layer_end = 0u64;
        for (l, layer) in self.layers.iter().enumerate() {
            let location = format!("layer {l}");
            if layer.block_size > layer.block_size_pad {
                return Err(Error::layout(
                    location,
                    format!(
                        "block size {} exceeds padded size {}",
                        layer.block_size, layer.block_size_pad
                    ),
                ));
            }
            if u64::from(layer.layer_start) < layer_end {
                return Err(Error::layout(
                    location,
                    format!(
                        "starts at {:#x}, overlapping the previous layer ending at {layer_end:#x}",
                        layer.layer_start
                    ),
                ));
            }
            layer_end = layer.end();
        }

        let mut previous_end = 0u64;
        for (s, segment) in self.segments.iter().enumerate() {
            if u64::from(segment.data_offset) < previous_end {
                return Err(Error::layout(
                    format!("segment {s}"),
                    format!(
                        "starts at {:#x}, overlapping the previous segment ending at {previous_end:#x}",
                        segment.data_offset
                    ),
                ));
            }
            if layer_end > u64::from(segment.layers_size) {
                return Err(Error::layout(
                    format!("segment {s}"),
                    format!(
                        "layers end at {layer_end:#x}, past the segment size {:#x}",
                        segment.layers_size
                    ),
                ));
            }
            previous_end = segment.end();
        }
        Ok(())
    }

    /// Compare this (computed) layout with a stored one
    #[must_use]
    pub fn consistency_warnings(&self, stored: &Layout) -> Vec<ConsistencyWarning> {
        let mut warnings = Vec::new();
        let mut check = |field, segment, layer, stored: u32, computed: u32| {
            if stored != computed {
                warnings.push(ConsistencyWarning {
                    field,
                    segment,
                    layer,
                    stored: u64::from(stored),
                    computed: u64::from(computed),
                });
            }
        };

        for (l, (c, st)) in self.layers.iter().zip(&stored.layers).enumerate() {
            check(LayoutField::BlockSizePad, None, Some(l), st.block_size_pad, c.block_size_pad);
            check(LayoutField::LayerStart, None, Some(l), st.layer_start, c.layer_start);
        }
        for (s, (c, st)) in self.segments.iter().zip(&stored.segments).enumerate() {
            check(LayoutField::LayersSize, Some(s), None, st.layers_size, c.layers_size);
            check(
                LayoutField::SegmentDataOffset,
                Some(s),
                None,
                st.data_offset,
                c.data_offset,
            );
        }
        check(
            LayoutField::BlockLayersSize,
            None,
            None,
            stored.block_layers_size,
            self.block_layers_size,
        );
        warnings
    }
}
