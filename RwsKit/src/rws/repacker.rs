//! Container repacking from a manifest and its artifacts

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use super::ProgressCallback;
use super::manifest::{ArtifactEntry, LayerEntry, Manifest};
use super::types::{RepackResult, RwsPhase, RwsProgress};
use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::formats::rws::{
    AudioHeader, ChunkVersions, HeaderTables, LayerConfigEntry, LayerInfo, Layout, RwsContainer,
    SegmentRecord, total_container_size,
};
use crate::utils::io::{COPY_BUFFER_SIZE, copy_all};
use crate::utils::path::validate_artifact_name;
use crate::utils::{padded_string_len, write_atomically, write_zeros};

/// Options controlling how artifacts may differ from the manifest
#[derive(Debug, Clone, Default)]
pub struct RepackOptions {
    /// Artifacts whose new size should replace the recorded block size
    pub resize: HashSet<String>,
    /// Accept new sizes for every artifact
    pub resize_all: bool,
    /// Alignment to plan with instead of the manifest's
    pub layout: Option<LayoutConfig>,
}

impl RepackOptions {
    /// Whether `artifact` may change size
    #[must_use]
    pub fn allows_resize(&self, artifact: &str) -> bool {
        self.resize_all || self.resize.contains(artifact)
    }

    /// Every name in `resize` must be an artifact of `manifest`
    ///
    /// # Errors
    /// Returns [`Error::InvalidManifest`] naming the first unknown artifact.
    pub fn check_resize_names(&self, manifest: &Manifest) -> Result<()> {
        let mut unknown: Vec<&String> = self
            .resize
            .iter()
            .filter(|name| !manifest.artifacts.contains_key(name.as_str()))
            .collect();
        unknown.sort();
        match unknown.first() {
            Some(name) => Err(Error::InvalidManifest(format!(
                "cannot resize {name}: no such artifact in the manifest"
            ))),
            None => Ok(()),
        }
    }
}

/// A block artifact validated against the manifest
struct BlockSource<'a> {
    path: PathBuf,
    entry: &'a ArtifactEntry,
    /// On-disk length, at most the layer's planned block size
    len: u64,
}

/// Rebuild a container from `input_dir` and write it to `container_path`
///
/// Everything is validated and the full layout planned before the temporary
/// output file is created.
pub(crate) fn repack_container(
    input_dir: &Path,
    container_path: &Path,
    options: &RepackOptions,
    progress: ProgressCallback,
) -> Result<RepackResult> {
    progress(&RwsProgress::new(RwsPhase::ReadingManifest, 0, 1));
    let manifest = Manifest::load(input_dir)?;
    let config = options.layout.unwrap_or(manifest.layout);
    config.validate()?;
    options.check_resize_names(&manifest)?;

    let grid = manifest.artifact_grid()?;
    let layer_count = manifest.layers.len();
    let total_blocks = manifest.artifacts.len();
    let mut usable_sizes = usable_sizes(&manifest)?;
    for layer in &manifest.layers {
        check_dsp_presence(layer)?;
    }

    // Artifact sizes
    let mut sources: Vec<Vec<BlockSource>> = Vec::with_capacity(grid.len());
    let mut longest = vec![0u32; layer_count];
    let mut changed = vec![false; layer_count];
    let mut resized = Vec::new();

    for (s, row) in grid.iter().enumerate() {
        let mut segment_sources = Vec::with_capacity(row.len());
        for (l, &(name, entry)) in row.iter().enumerate() {
            progress(&RwsProgress::with_file(
                RwsPhase::ValidatingArtifacts,
                s * layer_count + l + 1,
                total_blocks,
                name,
            ));

            let path = artifact_path(input_dir, name)?;
            let actual = artifact_len(&path)?;
            let recorded = manifest.layers[l].block_size;
            let size = if actual == u64::from(recorded) {
                recorded
            } else {
                if !options.allows_resize(name) {
                    return Err(Error::ManifestMismatch {
                        artifact: name.to_string(),
                        expected: u64::from(recorded),
                        actual,
                    });
                }
                let size = u32::try_from(actual).map_err(|_| {
                    Error::layout(
                        format!("segment {s} layer {l}"),
                        format!("artifact {name} is {actual} bytes, larger than 32 bits"),
                    )
                })?;
                tracing::info!("Resizing {}: {} -> {} bytes", name, recorded, actual);
                changed[l] = true;
                usable_sizes[s * layer_count + l] = size;
                resized.push(name.to_string());
                size
            };
            longest[l] = longest[l].max(size);
            segment_sources.push(BlockSource {
                path,
                entry,
                len: actual,
            });
        }
        sources.push(segment_sources);
    }

    // Blocks of a layer share one size: the longest of its artifacts once any changed
    let block_sizes: Vec<u32> = manifest
        .layers
        .iter()
        .enumerate()
        .map(|(l, layer)| if changed[l] { longest[l] } else { layer.block_size })
        .collect();

    // A layer whose block changed size loses its recorded padding everywhere
    let layer_resized: Vec<bool> = block_sizes
        .iter()
        .zip(&manifest.layers)
        .map(|(&size, layer)| size != layer.block_size)
        .collect();
    let any_resized = layer_resized.contains(&true);

    let data_offset = u64::from(manifest.container.data_offset);
    let prefix = match &manifest.prefix {
        Some(name) => {
            let path = artifact_path(input_dir, name)?;
            let actual = artifact_len(&path)?;
            if actual != data_offset {
                return Err(Error::ManifestMismatch {
                    artifact: name.clone(),
                    expected: data_offset,
                    actual,
                });
            }
            Some(path)
        }
        None if data_offset != 0 => {
            return Err(Error::InvalidManifest(format!(
                "data_offset is {data_offset:#x} but no prefix artifact is listed"
            )));
        }
        None => None,
    };
    let tail = match &manifest.tail {
        Some(name) => {
            let path = artifact_path(input_dir, name)?;
            let len = artifact_len(&path)?;
            Some((path, len))
        }
        None => None,
    };

    // Layout and tables
    progress(&RwsProgress::new(RwsPhase::PlanningLayout, 0, 1));
    let layout = Layout::plan(&block_sizes, manifest.segments.len(), &config)?;
    let (header, tables) = build_tables(&manifest, &layout, usable_sizes)?;
    let header_payload = RwsContainer::encode_header_payload(&header, &tables)?;

    let tail_len = tail.as_ref().map_or(0, |(_, len)| *len);
    let data_len = data_offset + layout.segments_end() + tail_len;
    let data_len = u32::try_from(data_len).map_err(|_| {
        Error::layout("data chunk", format!("data region of {data_len} bytes exceeds 32 bits"))
    })?;
    let header_len = u32::try_from(header_payload.len())
        .map_err(|_| Error::layout("header", "header chunk exceeds 32 bits"))?;
    total_container_size(header_len, data_len)?;

    let versions = ChunkVersions {
        container: manifest.container.container_version,
        header: manifest.container.header_version,
        data: manifest.container.data_version,
    };

    // Output
    let bytes_written = write_atomically(container_path, |w| {
        RwsContainer::write_prologue(w, versions, &header_payload, data_len)?;
        if let Some(path) = &prefix {
            copy_file(path, data_offset, w)?;
        }

        let mut written = 0u64;
        let mut index = 0usize;
        for ((segment, segment_sources), segment_entry) in
            layout.segments.iter().zip(&sources).zip(&manifest.segments)
        {
            write_zeros(w, u64::from(segment.data_offset) - written)?;

            for ((layer, source), &layer_changed) in
                layout.layers.iter().zip(segment_sources).zip(&layer_resized)
            {
                index += 1;
                progress(&RwsProgress::with_file(
                    RwsPhase::WritingContainer,
                    index,
                    total_blocks,
                    source.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                ));
                copy_file(&source.path, source.len, w)?;
                write_zeros(w, u64::from(layer.block_size) - source.len)?;
                let stored = (!layer_changed)
                    .then_some(source.entry.padding.as_deref())
                    .flatten();
                write_padding(w, stored, layer.padding_len())?;
            }

            let stored = (!any_resized).then_some(segment_entry.padding.as_deref()).flatten();
            write_padding(w, stored, layout.segment_padding_len(segment))?;
            written = segment.end();
        }

        if let Some((path, len)) = &tail {
            copy_file(path, *len, w)?;
        }
        Ok(())
    })?;

    progress(&RwsProgress::new(RwsPhase::Complete, total_blocks, total_blocks));
    tracing::info!(
        "Repacked {} block(s) from {} into {} ({} bytes)",
        total_blocks,
        input_dir.display(),
        container_path.display(),
        bytes_written
    );

    Ok(RepackResult {
        output: container_path.to_path_buf(),
        bytes_written,
        resized,
        layout: config,
    })
}

/// The usable-size table, checked to hold one entry per block
fn usable_sizes(manifest: &Manifest) -> Result<Vec<u32>> {
    let (segment_count, layer_count) = (manifest.segments.len(), manifest.layers.len());
    let sizes = &manifest.container.usable_sizes;
    if sizes.len() != segment_count * layer_count {
        return Err(Error::InvalidManifest(format!(
            "usable_sizes has {} entries, expected {} ({} segment(s) x {} layer(s))",
            sizes.len(),
            segment_count * layer_count,
            segment_count,
            layer_count
        )));
    }
    Ok(sizes.clone())
}

/// Build header and tables with every derived field taken from `layout`
fn build_tables(
    manifest: &Manifest,
    layout: &Layout,
    usable_sizes: Vec<u32>,
) -> Result<(AudioHeader, HeaderTables)> {
    let container = &manifest.container;
    check_padded_name("container name", &container.name_raw)?;

    let mut segments = Vec::with_capacity(manifest.segments.len());
    let mut segment_ids = Vec::with_capacity(manifest.segments.len());
    let mut segment_names = Vec::with_capacity(manifest.segments.len());
    for (entry, planned) in manifest.segments.iter().zip(&layout.segments) {
        check_padded_name(&format!("segment {} name", entry.index), &entry.name_raw)?;
        segments.push(SegmentRecord {
            opaque: entry.record,
            layers_size: planned.layers_size,
            data_offset: planned.data_offset,
        });
        segment_ids.push(entry.identity);
        segment_names.push(entry.name_raw.clone());
    }

    let (layer_infos, layer_configs) = manifest
        .layers
        .iter()
        .zip(&layout.layers)
        .map(|(layer, placed)| {
            (
                LayerInfo {
                    opaque_00: layer.info.opaque_00,
                    block_size_pad: placed.block_size_pad,
                    opaque_14: layer.info.opaque_14,
                    interleave: layer.info.interleave,
                    frame_size: layer.info.frame_size,
                    opaque_1c: layer.info.opaque_1c,
                    block_size: placed.block_size,
                    layer_start: placed.layer_start,
                },
                LayerConfigEntry {
                    config: layer.config.clone(),
                    dsp: layer.dsp.clone(),
                    trailer: layer.trailer,
                },
            )
        })
        .unzip();

    let header = AudioHeader {
        leading: container.leading,
        total_segments: count_u32(manifest.segments.len(), "segment")?,
        unknown_24: container.unknown_24,
        total_layers: count_u32(manifest.layers.len(), "layer")?,
        unknown_2c: container.unknown_2c,
        block_layers_size: layout.block_layers_size,
        data_offset: container.data_offset,
        unknown_3c: container.unknown_3c,
        identity: container.identity,
        name_raw: container.name_raw.clone(),
    };
    let tables = HeaderTables {
        segments,
        usable_sizes,
        segment_ids,
        segment_names,
        layer_infos,
        layer_configs,
        tail: container.header_tail.clone(),
    };
    Ok((header, tables))
}

fn count_u32(count: usize, what: &str) -> Result<u32> {
    u32::try_from(count)
        .map_err(|_| Error::InvalidManifest(format!("{count} {what} entries exceed 32 bits")))
}

/// A DSP record must accompany exactly the DSP codec, or the tables cannot be decoded again
fn check_dsp_presence(entry: &LayerEntry) -> Result<()> {
    let is_dsp = entry.config.codec.is_dsp();
    if is_dsp != entry.dsp.is_some() {
        return Err(Error::InvalidManifest(format!(
            "layer {}: codec {} {} a DSP record",
            entry.index,
            entry.config.codec,
            if is_dsp { "requires" } else { "must not have" }
        )));
    }
    Ok(())
}

/// Names must re-parse to the same length
fn check_padded_name(what: &str, raw: &[u8]) -> Result<()> {
    if padded_string_len(raw) != Some(raw.len()) {
        return Err(Error::InvalidManifest(format!(
            "{what} is not a NUL-terminated string padded to 16 bytes"
        )));
    }
    Ok(())
}

fn artifact_path(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_artifact_name(name)?;
    Ok(dir.join(name))
}

fn artifact_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(Error::ArtifactMissing {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::ArtifactMissing {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(Error::Io(e)),
    }
}

fn copy_file(path: &Path, len: u64, writer: &mut dyn Write) -> Result<()> {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(path)?);
    copy_all(&mut reader, len, writer)?;
    Ok(())
}

/// Write stored padding when it still fits exactly, zeros otherwise
fn write_padding(writer: &mut dyn Write, stored: Option<&[u8]>, len: u64) -> Result<()> {
    match stored {
        Some(bytes) if bytes.len() as u64 == len => {
            writer.write_all(bytes)?;
            Ok(())
        }
        _ => write_zeros(writer, len),
    }
}
