//! Container unpacking: layer artifacts plus manifest

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use indexmap::IndexMap;

use super::ProgressCallback;
use super::manifest::{
    ArtifactEntry, ContainerEntry, LayerEntry, LayerInfoEntry, MANIFEST_FORMAT_VERSION, Manifest,
    SegmentEntry,
};
use super::types::{RwsPhase, RwsProgress, UnpackResult};
use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::formats::rws::{ConsistencyWarning, Layout, RwsContainer};
use crate::utils::io::COPY_BUFFER_SIZE;
use crate::utils::{artifact_stem, copy_exact, string_from_padded};

/// Unpack `container_path` into `output_dir`
///
/// Extraction uses the offsets stored in the tables; the planner's view is
/// only used for the consistency report. The manifest is written last, so a
/// failed unpack never leaves a manifest behind.
pub(crate) fn unpack_container(
    container_path: &Path,
    output_dir: &Path,
    config: &LayoutConfig,
    progress: ProgressCallback,
) -> Result<UnpackResult> {
    config.validate()?;

    progress(&RwsProgress::new(RwsPhase::ReadingHeader, 0, 1));
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(container_path)?);
    let container = RwsContainer::read(&mut reader)?;

    progress(&RwsProgress::new(RwsPhase::PlanningLayout, 0, 1));
    let stored = container.stored_layout();
    let warnings = check_consistency(&stored, config);
    for warning in &warnings {
        tracing::warn!("{}: {}", container_path.display(), warning);
    }

    check_bounds(&container, &stored)?;
    fs::create_dir_all(output_dir)?;

    let name = container.header.name();
    let stem = artifact_stem(&name);
    let data_start = container.data_start();
    let data_offset = u64::from(container.header.data_offset);
    let total_blocks = stored.segments.len() * stored.layers.len();
    let mut bytes_extracted = 0u64;

    let prefix = if data_offset > 0 {
        let artifact = format!("{stem}_prefix.raw");
        bytes_extracted += extract_range(&mut reader, data_start, data_offset, &output_dir.join(&artifact))?;
        Some(artifact)
    } else {
        None
    };

    let layers = stored
        .layers
        .iter()
        .zip(&container.tables.layer_infos)
        .zip(&container.tables.layer_configs)
        .enumerate()
        .map(|(l, ((layer, info), entry))| LayerEntry {
            index: l,
            info: LayerInfoEntry {
                opaque_00: info.opaque_00,
                opaque_14: info.opaque_14,
                interleave: info.interleave,
                frame_size: info.frame_size,
                opaque_1c: info.opaque_1c,
            },
            config: entry.config.clone(),
            dsp: entry.dsp.clone(),
            trailer: entry.trailer,
            block_size: layer.block_size,
        })
        .collect();

    let mut segments = Vec::with_capacity(stored.segments.len());
    let mut artifacts = IndexMap::with_capacity(total_blocks);

    for (s, segment) in stored.segments.iter().enumerate() {
        let segment_start = data_start + data_offset + u64::from(segment.data_offset);

        for (l, layer) in stored.layers.iter().enumerate() {
            let artifact = Manifest::artifact_name(&stem, s, l);
            progress(&RwsProgress::with_file(
                RwsPhase::ExtractingLayers,
                artifacts.len() + 1,
                total_blocks,
                artifact.as_str(),
            ));

            let start = segment_start + u64::from(layer.layer_start);
            let block_size = u64::from(layer.block_size);
            bytes_extracted += extract_range(&mut reader, start, block_size, &output_dir.join(&artifact))?;
            let padding = read_nonzero(&mut reader, start + block_size, layer.padding_len())?;

            tracing::debug!(
                "Extracted {} ({} bytes at {:#x}, codec {})",
                artifact,
                layer.block_size,
                start,
                container.tables.layer_configs[l].config.codec.kind()
            );
            artifacts.insert(
                artifact,
                ArtifactEntry {
                    segment: s,
                    layer: l,
                    padding,
                },
            );
        }

        let record = &container.tables.segments[s];
        let name_raw = container.tables.segment_names[s].clone();
        segments.push(SegmentEntry {
            index: s,
            record: record.opaque,
            identity: container.tables.segment_ids[s],
            name: string_from_padded(&name_raw),
            name_raw,
            padding: read_nonzero(
                &mut reader,
                segment_start + stored.layers_end(),
                stored.segment_padding_len(segment),
            )?,
        });
    }

    let tail_start = data_offset + stored.segments_end();
    let tail = if tail_start < container.data_len() {
        let artifact = format!("{stem}_tail.raw");
        let len = container.data_len() - tail_start;
        bytes_extracted += extract_range(&mut reader, data_start + tail_start, len, &output_dir.join(&artifact))?;
        Some(artifact)
    } else {
        None
    };

    let header = &container.header;
    let manifest = Manifest {
        format_version: MANIFEST_FORMAT_VERSION,
        source_file: container_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        layout: *config,
        container: ContainerEntry {
            container_version: container.container.version,
            header_version: container.header_chunk.header.version,
            data_version: container.data_chunk.header.version,
            leading: header.leading,
            unknown_24: header.unknown_24,
            unknown_2c: header.unknown_2c,
            unknown_3c: header.unknown_3c,
            identity: header.identity,
            name,
            name_raw: header.name_raw.clone(),
            data_offset: header.data_offset,
            usable_sizes: container.tables.usable_sizes.clone(),
            header_tail: container.tables.tail.clone(),
        },
        segments,
        layers,
        artifacts,
        prefix,
        tail,
    };

    progress(&RwsProgress::new(RwsPhase::WritingManifest, 1, 1));
    let manifest_path = manifest.save(output_dir)?;

    progress(&RwsProgress::new(RwsPhase::Complete, total_blocks, total_blocks));
    tracing::info!(
        "Unpacked {} block(s) from {} into {}",
        total_blocks,
        container_path.display(),
        output_dir.display()
    );

    Ok(UnpackResult {
        manifest_path,
        artifact_count: total_blocks,
        bytes_extracted,
        warnings,
    })
}

/// Compare stored offsets with the planner's, for reporting only
pub(crate) fn check_consistency(stored: &Layout, config: &LayoutConfig) -> Vec<ConsistencyWarning> {
    match Layout::plan(&stored.block_sizes(), stored.segments.len(), config) {
        Ok(computed) => computed.consistency_warnings(stored),
        Err(e) => {
            tracing::warn!("Skipping layout consistency check: {}", e);
            Vec::new()
        }
    }
}

/// Every stored segment and block range must lie inside the data chunk
fn check_bounds(container: &RwsContainer, stored: &Layout) -> Result<()> {
    let data_start = container.data_start();
    let data_len = container.data_len();
    let data_offset = u64::from(container.header.data_offset);

    let ensure = |start: u64, len: u64| {
        if start + len > data_len {
            Err(Error::truncated(
                data_start + start,
                len,
                data_len.saturating_sub(start),
            ))
        } else {
            Ok(())
        }
    };

    ensure(0, data_offset)?;
    for segment in &stored.segments {
        let segment_start = data_offset + u64::from(segment.data_offset);
        ensure(segment_start, u64::from(segment.layers_size))?;
        for layer in &stored.layers {
            let padded = layer.block_size.max(layer.block_size_pad);
            ensure(segment_start + u64::from(layer.layer_start), u64::from(padded))?;
        }
    }
    Ok(())
}

fn extract_range<R: Read + Seek>(reader: &mut R, offset: u64, len: u64, path: &Path) -> Result<u64> {
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, File::create(path)?);
    let copied = copy_exact(reader, offset, len, &mut writer)?;
    writer.flush()?;
    Ok(copied)
}

/// Read padding bytes, keeping them only if any is non-zero
fn read_nonzero<R: Read + Seek>(reader: &mut R, offset: u64, len: u64) -> Result<Option<Vec<u8>>> {
    if len == 0 {
        return Ok(None);
    }
    reader.seek(SeekFrom::Start(offset))?;
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    Ok(bytes.iter().any(|&b| b != 0).then_some(bytes))
}
