//! Header of an asset wrapped in a stream section
//!
//! ```text
//! header_size u32
//!   name_size u32, name[name_size]
//!   identity[16]
//!   kind_size u32, kind[kind_size]
//!   rest (up to header_size)
//! file_size u32
//! file[file_size]
//! trailing bytes (up to the section end)
//! ```

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::utils::{sanitize_file_name, string_from_padded};

/// Size of the `header_size` and `file_size` words
pub const SIZE_FIELD_LEN: u64 = 4;

/// Decoded asset header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHeader {
    pub name_raw: Vec<u8>,
    pub identity: Uuid,
    pub kind_raw: Vec<u8>,
    /// Opaque bytes between the kind string and `header_size`
    pub rest: Vec<u8>,
}

impl AssetHeader {
    /// Parse the `header_size` bytes following the `header_size` word
    ///
    /// `offset` is the absolute position of `bytes`, for diagnostics.
    pub fn parse(bytes: &[u8], offset: u64) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let field = |cursor: &Cursor<&[u8]>| offset + cursor.position();

        let name_raw = read_sized(&mut cursor).map_err(|_| {
            Error::malformed(field(&cursor), "asset name runs past the asset header")
        })?;

        let mut identity = [0u8; 16];
        cursor.read_exact(&mut identity).map_err(|_| {
            Error::malformed(field(&cursor), "asset identity runs past the asset header")
        })?;

        let kind_raw = read_sized(&mut cursor).map_err(|_| {
            Error::malformed(field(&cursor), "asset kind runs past the asset header")
        })?;

        let consumed = cursor.position() as usize;
        Ok(Self {
            name_raw,
            identity: Uuid::from_bytes(identity),
            kind_raw,
            rest: bytes[consumed..].to_vec(),
        })
    }

    /// Value of the `header_size` word for this header
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        (4 + self.name_raw.len() + 16 + 4 + self.kind_raw.len() + self.rest.len()) as u64
    }

    /// Write the header body (without the `header_size` word)
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        write_sized(writer, &self.name_raw, "asset name")?;
        writer.write_all(self.identity.as_bytes())?;
        write_sized(writer, &self.kind_raw, "asset kind")?;
        writer.write_all(&self.rest)?;
        Ok(())
    }

    /// Asset name up to the first NUL
    #[must_use]
    pub fn name(&self) -> String {
        string_from_padded(&self.name_raw)
    }

    /// Kind string up to the first NUL
    #[must_use]
    pub fn kind(&self) -> String {
        string_from_padded(&self.kind_raw)
    }
}

fn read_sized(cursor: &mut Cursor<&[u8]>) -> io::Result<Vec<u8>> {
    let len = cursor.read_u32::<LittleEndian>()? as usize;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn write_sized<W: Write + ?Sized>(writer: &mut W, bytes: &[u8], what: &str) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| Error::layout(what, format!("{} bytes exceed 32 bits", bytes.len())))?;
    writer.write_u32::<LittleEndian>(len)?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Extension for a known asset kind; `None` means `.<kind>` is appended
fn kind_extension(kind: &str) -> Option<&'static str> {
    Some(match kind {
        "rwID_TEXDICTIONARY" => ".txd",
        "rwaID_WAVEDICT" => ".rws",
        "rwID_WORLD" => ".bsp",
        "TextStringDict" => ".txl",
        "rwID_CLUMP" => ".dff",
        "rwID_HANIMANIMATION" => ".anm",
        "SCRIPT" => ".ai",
        "rwID_2DFONT" => ".fnt",
        "KFset" => ".lpa",
        _ => return None,
    })
}

/// File name for the `index`-th section holding an asset called `name` of `kind`
///
/// Known kinds get their usual extension. A matching extension already on
/// the name is removed first, ignoring case, at most twice (`a.txd.TXD`
/// becomes `a.txd`).
#[must_use]
pub fn asset_file_name(index: usize, name: &str, kind: &str) -> String {
    let base = format!("{index}_{}", sanitize_file_name(name));
    match kind_extension(kind) {
        Some(ext) => {
            let stem = strip_extension(strip_extension(&base, ext), ext);
            format!("{stem}{ext}")
        }
        None => match sanitize_file_name(kind) {
            kind if kind.is_empty() => base,
            kind => format!("{base}.{kind}"),
        },
    }
}

fn strip_extension<'a>(name: &'a str, ext: &str) -> &'a str {
    let split = name.len().saturating_sub(ext.len());
    match name.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case(ext) => &name[..split],
        _ => name,
    }
}

/// File name for a section stored raw
#[must_use]
pub fn raw_file_name(index: usize, section_id: u32) -> String {
    format!("{index}_{section_id}.UNK")
}
