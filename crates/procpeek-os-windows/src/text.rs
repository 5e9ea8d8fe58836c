//! UTF-16 helpers for strings copied out of a target.

/// Reinterprets little-endian bytes as UTF-16 code units.
///
/// A trailing odd byte is ignored.
pub(crate) fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Returns `units` up to, not including, the first NUL.
pub(crate) fn until_nul(units: &[u16]) -> &[u16] {
    match units.iter().position(|&unit| unit == 0) {
        Some(index) => &units[..index],
        None => units,
    }
}

/// Returns the entries of an environment block.
///
/// Every `KEY=VALUE` entry keeps its NUL separator; the empty entry that
/// terminates the block and everything after it are dropped.
pub(crate) fn environment_block(units: &[u16]) -> &[u16] {
    let mut start = 0;

    while let Some(offset) = units[start..].iter().position(|&unit| unit == 0) {
        if offset == 0 {
            return &units[..start];
        }

        start += offset + 1;
    }

    units
}

/// Decodes a UTF-16 string cut at its first NUL.
pub(crate) fn decode_string(bytes: &[u8]) -> String {
    String::from_utf16_lossy(until_nul(&utf16_units(bytes)))
}

/// Decodes an environment block.
pub(crate) fn decode_environment(bytes: &[u8]) -> String {
    String::from_utf16_lossy(environment_block(&utf16_units(bytes)))
}
