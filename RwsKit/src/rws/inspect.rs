//! Read-only container report

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use super::extractor::check_consistency;
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::formats::rws::{ConsistencyWarning, RwsContainer};
use crate::utils::io::COPY_BUFFER_SIZE;

/// Summary of a container, as printed by `rwskit info`
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub name: String,
    pub identity: Uuid,
    pub container_version: u32,
    pub total_segments: u32,
    pub total_layers: u32,
    pub block_layers_size: u32,
    pub data_offset: u32,
    pub data_len: u64,
    pub segments: Vec<SegmentInfo>,
    /// Stored offsets that disagree with the layout planner, rendered as text
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub consistency: Vec<ConsistencyWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentInfo {
    pub index: usize,
    pub name: String,
    pub identity: Uuid,
    pub data_offset: u32,
    pub layers_size: u32,
    pub layers: Vec<LayerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u16,
    pub interleave: u16,
    pub frame_size: u16,
    pub block_size: u32,
    pub block_size_pad: u32,
    pub layer_start: u32,
    /// Bytes of audio in this segment's block, from the usable-size table
    pub usable_size: u32,
    pub estimated_samples: u64,
    /// Seconds, 0 when the sample rate is unknown
    pub duration: f64,
    pub has_dsp: bool,
}

/// Decode `path` without extracting anything
pub(crate) fn inspect_container(path: &Path, config: &LayoutConfig) -> Result<ContainerInfo> {
    config.validate()?;
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(path)?);
    let container = RwsContainer::read(&mut reader)?;

    let stored = container.stored_layout();
    let consistency = check_consistency(&stored, config);
    let total_layers = stored.layers.len();
    let tables = &container.tables;

    let segments = stored
        .segments
        .iter()
        .enumerate()
        .map(|(s, segment)| SegmentInfo {
            index: s,
            name: crate::utils::string_from_padded(&tables.segment_names[s]),
            identity: tables.segment_ids[s],
            data_offset: segment.data_offset,
            layers_size: segment.layers_size,
            layers: stored
                .layers
                .iter()
                .zip(&tables.layer_infos)
                .zip(&tables.layer_configs)
                .enumerate()
                .map(|(l, ((layer, info), entry))| {
                    let config = &entry.config;
                    let kind = config.codec.kind();
                    let usable_size = tables.usable_sizes[s * total_layers + l];
                    let estimated_samples =
                        kind.estimate_samples(u64::from(usable_size), config.channels);
                    let duration = if config.sample_rate == 0 {
                        0.0
                    } else {
                        estimated_samples as f64 / f64::from(config.sample_rate)
                    };

                    LayerSummary {
                        index: l,
                        codec: kind.to_string(),
                        sample_rate: config.sample_rate,
                        channels: config.channels,
                        bits_per_sample: config.bits_per_sample,
                        interleave: info.interleave,
                        frame_size: info.frame_size,
                        block_size: layer.block_size,
                        block_size_pad: layer.block_size_pad,
                        layer_start: layer.layer_start,
                        usable_size,
                        estimated_samples,
                        duration,
                        has_dsp: entry.dsp.is_some(),
                    }
                })
                .collect(),
        })
        .collect();

    let header = &container.header;
    Ok(ContainerInfo {
        name: header.name(),
        identity: header.identity,
        container_version: container.container.version,
        total_segments: header.total_segments,
        total_layers: header.total_layers,
        block_layers_size: header.block_layers_size,
        data_offset: header.data_offset,
        data_len: container.data_len(),
        segments,
        warnings: consistency.iter().map(ToString::to_string).collect(),
        consistency,
    })
}
