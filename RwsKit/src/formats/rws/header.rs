//! Fixed audio header fields and the container name

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use super::{BASE_HEADER_SIZE, IDENTITY_SIZE};
use crate::error::{Error, Result};
use crate::utils::{padded_string_len, string_from_padded};

/// The base audio header at the start of the header chunk payload
///
/// ```text
/// 0x00  leading words (opaque)
/// 0x20  total_segments
/// 0x24  opaque
/// 0x28  total_layers
/// 0x2C  opaque
/// 0x34  block_layers_size
/// 0x38  data_offset (relative to the data chunk payload)
/// 0x3C  opaque
/// 0x40  container identity
/// 0x50  name, NUL-terminated and padded to 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHeader {
    pub leading: [u8; 0x20],
    pub total_segments: u32,
    pub unknown_24: [u8; 4],
    pub total_layers: u32,
    pub unknown_2c: [u8; 8],
    /// Sum of every layer's padded block size
    pub block_layers_size: u32,
    /// Offset of the first segment within the data chunk payload
    pub data_offset: u32,
    pub unknown_3c: [u8; 4],
    pub identity: Uuid,
    /// Name bytes including the terminator and padding
    pub name_raw: Vec<u8>,
}

impl AudioHeader {
    /// Container name without padding
    #[must_use]
    pub fn name(&self) -> String {
        string_from_padded(&self.name_raw)
    }

    /// Bytes occupied by the base header and name
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        BASE_HEADER_SIZE + self.name_raw.len()
    }

    /// Parse the base header from the start of a header chunk payload.
    ///
    /// `payload_offset` is the absolute offset of the payload, used for
    /// error reporting.
    ///
    /// # Errors
    /// Returns [`Error::MalformedHeader`] if the payload is shorter than the
    /// fixed fields plus the padded name, or the name is unterminated.
    pub fn parse(payload: &[u8], payload_offset: u64) -> Result<Self> {
        if payload.len() < BASE_HEADER_SIZE {
            return Err(Error::malformed(
                payload_offset,
                format!(
                    "header chunk declares {} bytes, fixed fields need {BASE_HEADER_SIZE:#x}",
                    payload.len()
                ),
            ));
        }

        let name_offset = payload_offset + BASE_HEADER_SIZE as u64;
        let name_area = &payload[BASE_HEADER_SIZE..];
        let name_len = padded_string_len(name_area).ok_or_else(|| {
            Error::malformed(name_offset, "container name is not NUL-terminated")
        })?;
        if name_len > name_area.len() {
            return Err(Error::malformed(
                name_offset,
                format!(
                    "padded name needs {name_len} bytes, header chunk has {} left",
                    name_area.len()
                ),
            ));
        }

        let mut cursor = Cursor::new(payload);
        Self::read_fields(&mut cursor, name_area[..name_len].to_vec())
            .map_err(|_| Error::truncated(payload_offset, BASE_HEADER_SIZE as u64, payload.len() as u64))
    }

    fn read_fields<R: Read>(reader: &mut R, name_raw: Vec<u8>) -> io::Result<Self> {
        let mut leading = [0u8; 0x20];
        reader.read_exact(&mut leading)?;
        let total_segments = reader.read_u32::<LittleEndian>()?;
        let mut unknown_24 = [0u8; 4];
        reader.read_exact(&mut unknown_24)?;
        let total_layers = reader.read_u32::<LittleEndian>()?;
        let mut unknown_2c = [0u8; 8];
        reader.read_exact(&mut unknown_2c)?;
        let block_layers_size = reader.read_u32::<LittleEndian>()?;
        let data_offset = reader.read_u32::<LittleEndian>()?;
        let mut unknown_3c = [0u8; 4];
        reader.read_exact(&mut unknown_3c)?;
        let mut identity = [0u8; IDENTITY_SIZE];
        reader.read_exact(&mut identity)?;

        Ok(Self {
            leading,
            total_segments,
            unknown_24,
            total_layers,
            unknown_2c,
            block_layers_size,
            data_offset,
            unknown_3c,
            identity: Uuid::from_bytes(identity),
            name_raw,
        })
    }

    /// Write the base header and padded name
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.leading)?;
        writer.write_u32::<LittleEndian>(self.total_segments)?;
        writer.write_all(&self.unknown_24)?;
        writer.write_u32::<LittleEndian>(self.total_layers)?;
        writer.write_all(&self.unknown_2c)?;
        writer.write_u32::<LittleEndian>(self.block_layers_size)?;
        writer.write_u32::<LittleEndian>(self.data_offset)?;
        writer.write_all(&self.unknown_3c)?;
        writer.write_all(self.identity.as_bytes())?;
        writer.write_all(&self.name_raw)?;
        Ok(())
    }
}
