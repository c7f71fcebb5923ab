//! UTF-16LE text decoding.

use std::char::{decode_utf16, REPLACEMENT_CHARACTER};

use byteorder::{ByteOrder, LittleEndian};

/// Decode a run of little-endian UTF-16 code units into a `String`.
///
/// A high surrogate immediately followed by a low surrogate combines into one
/// supplementary code point. Unpaired surrogates become U+FFFD. A trailing odd
/// byte is ignored.
///
/// # Example
///
/// ```
/// use gpk_common::text::decode_utf16le;
///
/// let bytes = [0x48, 0x00, 0x69, 0x00];
/// assert_eq!(decode_utf16le(&bytes), "Hi");
/// ```
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units = bytes.chunks_exact(2).map(LittleEndian::read_u16);
    decode_utf16(units)
        .map(|unit| unit.unwrap_or(REPLACEMENT_CHARACTER))
        .collect()
}
