//! Stream bundle repacking

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use super::StreamRepackResult;
use super::asset::{AssetHeader, SIZE_FIELD_LEN};
use super::manifest::{SectionEntry, StreamManifest};
use crate::error::{Error, Result};
use crate::formats::rws::ChunkHeader;
use crate::rws::{ProgressCallback, RwsPhase, RwsProgress};
use crate::utils::io::{COPY_BUFFER_SIZE, copy_all};
use crate::utils::path::validate_artifact_name;
use crate::utils::write_atomically;

/// A section ready to be written
struct PlannedSection<'a> {
    entry: &'a SectionEntry,
    path: PathBuf,
    file_len: u64,
    header: Option<AssetHeader>,
    size: u32,
}

/// Rebuild a bundle from `input_dir`, recomputing every size from the files on disk
pub(crate) fn repack_stream(
    input_dir: &Path,
    stream_path: &Path,
    progress: ProgressCallback,
) -> Result<StreamRepackResult> {
    progress(&RwsProgress::new(RwsPhase::ReadingManifest, 0, 1));
    let manifest = StreamManifest::load(input_dir)?;
    let total = manifest.sections.len();

    let mut planned = Vec::with_capacity(total);
    for (i, entry) in manifest.sections.iter().enumerate() {
        progress(&RwsProgress::with_file(
            RwsPhase::ValidatingArtifacts,
            i + 1,
            total,
            entry.file_name.as_str(),
        ));
        planned.push(plan_section(input_dir, entry)?);
    }

    let bytes_written = write_atomically(stream_path, |w| {
        for (i, section) in planned.iter().enumerate() {
            progress(&RwsProgress::with_file(
                RwsPhase::WritingContainer,
                i + 1,
                total,
                section.entry.file_name.as_str(),
            ));
            ChunkHeader::new(section.entry.section_id, section.size, section.entry.version).write(w)?;

            if let (Some(header), Some(asset)) = (&section.header, &section.entry.asset) {
                w.write_u32::<LittleEndian>(header.encoded_len() as u32)?;
                header.write(w)?;
                w.write_u32::<LittleEndian>(section.file_len as u32)?;
                copy_file(&section.path, section.file_len, w)?;
                w.write_all(&asset.trailing)?;
            } else {
                copy_file(&section.path, section.file_len, w)?;
            }
        }
        Ok(())
    })?;

    progress(&RwsProgress::new(RwsPhase::Complete, total, total));
    tracing::info!(
        "Repacked {} section(s) from {} into {} ({} bytes)",
        total,
        input_dir.display(),
        stream_path.display(),
        bytes_written
    );

    Ok(StreamRepackResult {
        output: stream_path.to_path_buf(),
        bytes_written,
        section_count: total,
    })
}

/// Check the section's file and compute every size field it needs
fn plan_section<'a>(input_dir: &Path, entry: &'a SectionEntry) -> Result<PlannedSection<'a>> {
    validate_artifact_name(&entry.file_name)?;
    let path = input_dir.join(&entry.file_name);
    let file_len = match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Err(Error::ArtifactMissing { path }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::ArtifactMissing { path }),
        Err(e) => return Err(Error::Io(e)),
    };

    let location = || format!("section {}", entry.index);
    let too_large = |what: &str, len: u64| Error::layout(location(), format!("{what} of {len} bytes exceeds 32 bits"));

    let header = entry.asset.as_ref().map(super::manifest::AssetEntry::header);
    let size = match (&header, &entry.asset) {
        (Some(header), Some(asset)) => {
            let header_len = header.encoded_len();
            u32::try_from(header_len).map_err(|_| too_large("asset header", header_len))?;
            u32::try_from(file_len).map_err(|_| too_large("asset file", file_len))?;
            SIZE_FIELD_LEN + header_len + SIZE_FIELD_LEN + file_len + asset.trailing.len() as u64
        }
        _ => file_len,
    };
    let size = u32::try_from(size).map_err(|_| too_large("section", size))?;

    Ok(PlannedSection {
        entry,
        path,
        file_len,
        header,
        size,
    })
}

fn copy_file(path: &Path, len: u64, writer: &mut dyn Write) -> Result<()> {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(path)?);
    copy_all(&mut reader, len, writer)?;
    Ok(())
}
