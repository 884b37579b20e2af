//! Chunk framing shared by RWS containers and `.stream` bundles

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::CHUNK_HEADER_SIZE;
use crate::error::{Error, Result};

/// The 12-byte header preceding every chunk payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: u32,
    /// Payload size in bytes, excluding this header
    pub size: u32,
    pub version: u32,
}

impl ChunkHeader {
    #[must_use]
    pub fn new(id: u32, size: u32, version: u32) -> Self {
        Self { id, size, version }
    }

    /// Read a chunk header
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            id: reader.read_u32::<LittleEndian>()?,
            size: reader.read_u32::<LittleEndian>()?,
            version: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Write a chunk header
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.id)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        Ok(())
    }
}

/// A chunk located within its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub header: ChunkHeader,
    /// Absolute offset of the first payload byte
    pub offset: u64,
}

impl Chunk {
    /// Payload length
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::from(self.header.size)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.size == 0
    }

    /// Absolute offset one past the last payload byte
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.len()
    }
}

/// Lazily yields the chunks laid out back to back in `[start, end)`.
///
/// Payloads are not read; callers seek to [`Chunk::offset`] or use
/// [`ChunkReader::read_payload`]. Iteration stops at the first error and
/// cannot be restarted.
pub struct ChunkReader<R> {
    reader: R,
    position: u64,
    end: u64,
    finished: bool,
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Iterate chunks from `start` up to `end`
    pub fn new(reader: R, start: u64, end: u64) -> Self {
        Self {
            reader,
            position: start,
            end,
            finished: false,
        }
    }

    /// Access the underlying reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Read a chunk payload fully into memory
    pub fn read_payload(&mut self, chunk: &Chunk) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(chunk.offset))?;
        let mut payload = vec![0u8; chunk.header.size as usize];
        self.reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::truncated(chunk.offset, chunk.len(), 0)
            } else {
                Error::Io(e)
            }
        })?;
        Ok(payload)
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.position >= self.end {
            return Ok(None);
        }

        let remaining = self.end - self.position;
        if remaining < CHUNK_HEADER_SIZE {
            return Err(Error::truncated(self.position, CHUNK_HEADER_SIZE, remaining));
        }

        self.reader.seek(SeekFrom::Start(self.position))?;
        let header = ChunkHeader::read(&mut self.reader).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::truncated(self.position, CHUNK_HEADER_SIZE, 0)
            } else {
                Error::Io(e)
            }
        })?;

        let offset = self.position + CHUNK_HEADER_SIZE;
        let available = self.end - offset;
        if u64::from(header.size) > available {
            return Err(Error::truncated(offset, u64::from(header.size), available));
        }

        let chunk = Chunk { header, offset };
        self.position = chunk.end();
        Ok(Some(chunk))
    }
}

impl<R: Read + Seek> Iterator for ChunkReader<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
