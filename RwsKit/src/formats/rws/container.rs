//! Container-level parsing: outer chunk, header chunk, data chunk

use std::io::{Read, Seek, SeekFrom, Write};

use super::{
    AudioHeader, CHUNK_HEADER_SIZE, CONTAINER_ID, Chunk, ChunkHeader, ChunkReader, DATA_CHUNK_ID,
    HEADER_CHUNK_ID, HeaderTables, Layout, TableDecoder,
};
use crate::error::{Error, Result};

/// A parsed RWS container
///
/// Holds the decoded header and tables plus the location of the data
/// chunk; payload bytes are never loaded.
#[derive(Debug, Clone)]
pub struct RwsContainer {
    /// Outer container chunk header
    pub container: ChunkHeader,
    pub header_chunk: Chunk,
    pub data_chunk: Chunk,
    pub header: AudioHeader,
    pub tables: HeaderTables,
}

impl RwsContainer {
    /// Parse a container from the start of `reader`
    ///
    /// # Errors
    /// - [`Error::TruncatedInput`] if any declared size runs past the available bytes
    /// - [`Error::MalformedHeader`] if an identity does not match, the chunk sequence is
    ///   wrong, or bytes follow the declared container end
    /// - [`Error::CountOverflow`] if a table declares more records than the header holds
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_len < CHUNK_HEADER_SIZE {
            return Err(Error::truncated(0, CHUNK_HEADER_SIZE, file_len));
        }
        let container = ChunkHeader::read(reader)?;
        if container.id != CONTAINER_ID {
            return Err(Error::malformed(
                0,
                format!(
                    "expected container id {CONTAINER_ID:#x}, found {:#x}",
                    container.id
                ),
            ));
        }

        let declared_end = CHUNK_HEADER_SIZE + u64::from(container.size);
        if declared_end > file_len {
            return Err(Error::truncated(
                CHUNK_HEADER_SIZE,
                u64::from(container.size),
                file_len - CHUNK_HEADER_SIZE,
            ));
        }
        if declared_end < file_len {
            return Err(Error::malformed(
                declared_end,
                format!(
                    "{} byte(s) after the declared container end",
                    file_len - declared_end
                ),
            ));
        }

        let mut chunks = ChunkReader::new(&mut *reader, CHUNK_HEADER_SIZE, declared_end);

        let header_chunk = expect_chunk(chunks.next(), HEADER_CHUNK_ID, CHUNK_HEADER_SIZE, "header")?;
        let payload = chunks.read_payload(&header_chunk)?;

        let data_chunk = expect_chunk(chunks.next(), DATA_CHUNK_ID, header_chunk.end(), "data")?;
        if let Some(extra) = chunks.next() {
            let extra = extra?;
            return Err(Error::malformed(
                extra.offset - CHUNK_HEADER_SIZE,
                format!(
                    "unexpected chunk {:#x} after the data chunk",
                    extra.header.id
                ),
            ));
        }

        let header = AudioHeader::parse(&payload, header_chunk.offset)?;
        tracing::debug!(
            "Header {:?}: {} segment(s), {} layer(s), data offset {:#x}",
            header.name(),
            header.total_segments,
            header.total_layers,
            header.data_offset
        );

        let mut decoder = TableDecoder::new(&payload, header.encoded_len(), header_chunk.offset);
        let tables = HeaderTables::decode(&mut decoder, &header)?;

        Ok(Self {
            container,
            header_chunk,
            data_chunk,
            header,
            tables,
        })
    }

    /// The layout recorded in the tables
    #[must_use]
    pub fn stored_layout(&self) -> Layout {
        Layout::from_tables(&self.header, &self.tables)
    }

    /// Absolute offset of the data region
    #[must_use]
    pub fn data_start(&self) -> u64 {
        self.data_chunk.offset
    }

    /// Length of the data region
    #[must_use]
    pub fn data_len(&self) -> u64 {
        self.data_chunk.len()
    }

    /// Serialize the header and tables into a header chunk payload
    pub fn encode_header_payload(header: &AudioHeader, tables: &HeaderTables) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(header.encoded_len() + tables.encoded_len());
        header.write(&mut payload)?;
        tables.write(&mut payload)?;
        Ok(payload)
    }

    /// Write the outer container header and header chunk, and open the data chunk.
    ///
    /// The caller writes exactly `data_len` bytes of data region afterwards.
    pub fn write_prologue<W: Write + ?Sized>(
        writer: &mut W,
        versions: ChunkVersions,
        header_payload: &[u8],
        data_len: u32,
    ) -> Result<()> {
        let header_len = u32::try_from(header_payload.len())
            .map_err(|_| Error::layout("header", "header chunk exceeds 32 bits"))?;
        let container_size = total_container_size(header_len, data_len)?;

        ChunkHeader::new(CONTAINER_ID, container_size, versions.container).write(writer)?;
        ChunkHeader::new(HEADER_CHUNK_ID, header_len, versions.header).write(writer)?;
        writer.write_all(header_payload)?;
        ChunkHeader::new(DATA_CHUNK_ID, data_len, versions.data).write(writer)?;
        Ok(())
    }
}

/// Version words carried by the container, header and data chunk headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkVersions {
    pub container: u32,
    pub header: u32,
    pub data: u32,
}

/// Size field of the outer container for the given chunk payload sizes
pub fn total_container_size(header_len: u32, data_len: u32) -> Result<u32> {
    let total = 2 * CHUNK_HEADER_SIZE + u64::from(header_len) + u64::from(data_len);
    u32::try_from(total)
        .map_err(|_| Error::layout("container", format!("container size {total} exceeds 32 bits")))
}

fn expect_chunk(
    next: Option<Result<Chunk>>,
    id: u32,
    offset: u64,
    what: &str,
) -> Result<Chunk> {
    let chunk = next
        .transpose()?
        .ok_or_else(|| Error::malformed(offset, format!("missing {what} chunk")))?;
    if chunk.header.id != id {
        return Err(Error::malformed(
            chunk.offset - CHUNK_HEADER_SIZE,
            format!(
                "expected {what} chunk id {id:#x}, found {:#x}",
                chunk.header.id
            ),
        ));
    }
    Ok(chunk)
}
