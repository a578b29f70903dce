//! UTF-16 detection and transcoding for files about to be uploaded.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("UTF-16 content must have an even number of bytes, got {0}")]
    OddLength(usize),
}

/// True when the content starts with a UTF-16 byte-order mark.
pub fn is_utf16(bytes: &[u8]) -> bool {
    matches!(bytes, [0xfe, 0xff, ..] | [0xff, 0xfe, ..])
}

/// Decode UTF-16 content into a UTF-8 string.
///
/// Byte order follows the BOM (little-endian when there is none). The BOM
/// itself is decoded as well and shows up as U+FEFF. Unpaired surrogates become
/// U+FFFD.
pub fn decode_utf16(bytes: &[u8]) -> Result<String, EncodingError> {
    if bytes.len() % 2 != 0 {
        return Err(EncodingError::OddLength(bytes.len()));
    }
    let big_endian = matches!(bytes, [0xfe, 0xff, ..]);
    let units = bytes.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    Ok(char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}
