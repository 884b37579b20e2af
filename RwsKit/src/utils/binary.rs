//! Alignment and padded-string helpers shared by the binary codecs

/// Strings in RWS headers are NUL-terminated and padded to this boundary.
pub const STRING_ALIGNMENT: usize = 0x10;

/// Round `value` up to the next multiple of `alignment`.
///
/// An alignment of 0 or 1 leaves the value unchanged. Returns `None` on overflow.
#[must_use]
pub fn round_up(value: u64, alignment: u64) -> Option<u64> {
    if alignment <= 1 {
        return Some(value);
    }
    let rem = value % alignment;
    if rem == 0 {
        Some(value)
    } else {
        value.checked_add(alignment - rem)
    }
}

/// Size of the padded string at the start of `bytes`, or `None` if no NUL is present.
///
/// A string of `n` characters occupies `n + (16 - n % 16)` bytes, so the
/// terminator always fits and a 16-character name takes 32 bytes.
#[must_use]
pub fn padded_string_len(bytes: &[u8]) -> Option<usize> {
    let n = bytes.iter().position(|&b| b == 0)?;
    Some(n + (STRING_ALIGNMENT - n % STRING_ALIGNMENT))
}

/// Decode the NUL-terminated text of a padded string, lossily.
#[must_use]
pub fn string_from_padded(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
