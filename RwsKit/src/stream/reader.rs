//! Stream bundle unpacking

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::asset::{AssetHeader, SIZE_FIELD_LEN, asset_file_name, raw_file_name};
use super::manifest::{AssetEntry, STREAM_MANIFEST_VERSION, SectionEntry, StreamManifest};
use super::{STREAM_SECTION_ID, StreamUnpackResult};
use crate::error::{Error, Result};
use crate::formats::rws::{Chunk, ChunkReader};
use crate::rws::{ProgressCallback, RwsPhase, RwsProgress};
use crate::utils::copy_exact;
use crate::utils::io::COPY_BUFFER_SIZE;

/// Split `stream_path` into one file per section plus `manifest.json`
pub(crate) fn unpack_stream(
    stream_path: &Path,
    output_dir: &Path,
    progress: ProgressCallback,
) -> Result<StreamUnpackResult> {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(stream_path)?);
    let len = reader.seek(SeekFrom::End(0))?;
    fs::create_dir_all(output_dir)?;

    let mut sections = Vec::new();
    let mut bytes_extracted = 0u64;
    let mut chunks = ChunkReader::new(&mut reader, 0, len);

    while let Some(chunk) = chunks.next() {
        let chunk = chunk?;
        let index = sections.len() + 1;
        let reader = chunks.get_mut();

        let entry = if chunk.header.id == STREAM_SECTION_ID {
            let (header, file_offset, file_len) = read_asset_header(reader, &chunk)?;
            let file_name = asset_file_name(index, &header.name(), &header.kind());
            progress(&RwsProgress::with_file(
                RwsPhase::ExtractingAssets,
                index,
                0,
                file_name.as_str(),
            ));

            bytes_extracted += extract(reader, file_offset, file_len, &output_dir.join(&file_name))?;

            let trailing_len = chunk.end() - (file_offset + file_len);
            let mut trailing = vec![0u8; trailing_len as usize];
            reader.read_exact(&mut trailing)?;

            tracing::debug!(
                "Section {}: asset {:?} ({}, {} bytes)",
                index,
                header.name(),
                header.kind(),
                file_len
            );
            SectionEntry {
                index,
                file_name,
                section_id: chunk.header.id,
                version: chunk.header.version,
                asset: Some(AssetEntry::new(header, trailing)),
            }
        } else {
            let file_name = raw_file_name(index, chunk.header.id);
            progress(&RwsProgress::with_file(
                RwsPhase::ExtractingAssets,
                index,
                0,
                file_name.as_str(),
            ));
            bytes_extracted += extract(reader, chunk.offset, chunk.len(), &output_dir.join(&file_name))?;
            tracing::debug!(
                "Section {}: raw section {:#x} ({} bytes)",
                index,
                chunk.header.id,
                chunk.len()
            );
            SectionEntry {
                index,
                file_name,
                section_id: chunk.header.id,
                version: chunk.header.version,
                asset: None,
            }
        };
        sections.push(entry);
    }

    let manifest = StreamManifest {
        format_version: STREAM_MANIFEST_VERSION,
        source_file: stream_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        sections,
    };

    progress(&RwsProgress::new(RwsPhase::WritingManifest, 1, 1));
    let manifest_path = manifest.save(output_dir)?;

    let section_count = manifest.sections.len();
    let asset_count = manifest.sections.iter().filter(|s| s.asset.is_some()).count();
    progress(&RwsProgress::new(RwsPhase::Complete, section_count, section_count));
    tracing::info!(
        "Unpacked {} section(s) ({} asset(s)) from {} into {}",
        section_count,
        asset_count,
        stream_path.display(),
        output_dir.display()
    );

    Ok(StreamUnpackResult {
        manifest_path,
        section_count,
        asset_count,
        bytes_extracted,
    })
}

/// Decode the asset header of a wrapped section
///
/// Returns the header plus the absolute offset and length of the file bytes.
fn read_asset_header<R: Read + Seek>(reader: &mut R, chunk: &Chunk) -> Result<(AssetHeader, u64, u64)> {
    let need = |offset: u64, len: u64| {
        if offset + len > chunk.end() {
            Err(Error::truncated(offset, len, chunk.end().saturating_sub(offset)))
        } else {
            Ok(())
        }
    };

    need(chunk.offset, SIZE_FIELD_LEN)?;
    reader.seek(SeekFrom::Start(chunk.offset))?;
    let header_size = u64::from(reader.read_u32::<LittleEndian>()?);

    let header_offset = chunk.offset + SIZE_FIELD_LEN;
    need(header_offset, header_size)?;
    let mut bytes = vec![0u8; header_size as usize];
    reader.read_exact(&mut bytes)?;
    let header = AssetHeader::parse(&bytes, header_offset)?;

    let size_offset = header_offset + header_size;
    need(size_offset, SIZE_FIELD_LEN)?;
    let file_len = u64::from(reader.read_u32::<LittleEndian>()?);

    let file_offset = size_offset + SIZE_FIELD_LEN;
    need(file_offset, file_len)?;
    Ok((header, file_offset, file_len))
}

fn extract<R: Read + Seek>(reader: &mut R, offset: u64, len: u64, path: &Path) -> Result<u64> {
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, File::create(path)?);
    let copied = copy_exact(reader, offset, len, &mut writer)?;
    writer.flush()?;
    Ok(copied)
}
