//! Streaming copy and atomic output helpers

use std::fs;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Buffer size for streaming payload copies.
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Copy exactly `len` bytes starting at `offset` in `reader` into `writer`.
///
/// # Errors
/// Returns [`Error::TruncatedInput`] if the source ends before `len` bytes were copied.
pub fn copy_exact<R, W>(reader: &mut R, offset: u64, len: u64, writer: &mut W) -> Result<u64>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    reader.seek(SeekFrom::Start(offset))?;
    let copied = io::copy(&mut reader.take(len), writer)?;
    if copied != len {
        return Err(Error::truncated(offset, len, copied));
    }
    Ok(copied)
}

/// Copy the whole of `reader` into `writer`, requiring exactly `len` bytes.
///
/// Used for artifacts whose size was validated before the write started.
pub fn copy_all<R, W>(reader: &mut R, len: u64, writer: &mut W) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let copied = io::copy(&mut reader.take(len), writer)?;
    if copied != len {
        return Err(Error::truncated(0, len, copied));
    }
    Ok(copied)
}

/// Write `len` zero bytes.
pub fn write_zeros<W: Write + ?Sized>(writer: &mut W, len: u64) -> Result<()> {
    io::copy(&mut io::repeat(0).take(len), writer)?;
    Ok(())
}

/// Write `target` through a temporary file in the same directory, then rename it into place.
///
/// The target is never observed partially written: on any error the temporary
/// file is discarded and an existing target is left untouched.
///
/// Returns the number of bytes written.
pub fn write_atomically<F>(target: &Path, write: F) -> Result<u64>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".rwskit-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, temp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    let written = temp.as_file().metadata()?.len();
    temp.persist(target).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote {} bytes to {}", written, target.display());
    Ok(written)
}
