//! Decompression of size-prefixed zlib envelopes.
//!
//! The index blob (after the keystream is removed) and `DFLT` payloads share
//! one layout: a big-endian `u32` holding the uncompressed size, followed by
//! a zlib-wrapped deflate stream.

use flate2::{Decompress, DecompressError, FlushDecompress, Status};
use gpk_common::BinaryReader;

use crate::error::DecodeError;

/// Length of the big-endian size prefix.
pub const SIZE_PREFIX_LEN: usize = 4;

/// Deflate cannot expand input by more than this factor.
const MAX_DEFLATE_RATIO: usize = 1032;

/// Decompress a size-prefixed zlib envelope.
///
/// Returns exactly the declared number of bytes. A declared size of zero is
/// rejected, as is any stream that inflates to a different length.
pub fn decompress_envelope(blob: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut reader = BinaryReader::new(blob);
    let size = reader
        .read_u32_be()
        .map_err(|_| DecodeError::Truncated { len: blob.len() })?;

    if size == 0 {
        return Err(DecodeError::EmptySize);
    }

    inflate_exact(reader.remaining_bytes(), size as usize)
}

/// Inflate a zlib stream into a buffer of exactly `size` bytes.
pub fn inflate_exact(stream: &[u8], size: usize) -> Result<Vec<u8>, DecodeError> {
    if size > stream.len().saturating_mul(MAX_DEFLATE_RATIO) {
        return Err(DecodeError::Codec {
            detail: format!(
                "declared size {size} is impossible for a {}-byte stream",
                stream.len()
            ),
        });
    }

    let mut output = vec![0u8; size];
    let mut inflater = Decompress::new(true);

    let status = inflater
        .decompress(stream, &mut output, FlushDecompress::Finish)
        .map_err(codec_error)?;
    let written = inflater.total_out() as usize;

    match status {
        Status::StreamEnd if written == size => Ok(output),
        Status::StreamEnd => Err(DecodeError::Codec {
            detail: format!("stream ended after {written} of {size} declared bytes"),
        }),
        Status::Ok | Status::BufError if written < size => Err(DecodeError::Codec {
            detail: format!("input exhausted after {written} of {size} declared bytes"),
        }),
        Status::Ok | Status::BufError => {
            // Output is full; the stream may still owe its checksum.
            let consumed = (inflater.total_in() as usize).min(stream.len());
            let mut spill = [0u8; 1];
            let status = inflater
                .decompress(&stream[consumed..], &mut spill, FlushDecompress::Finish)
                .map_err(codec_error)?;

            if matches!(status, Status::StreamEnd) && inflater.total_out() as usize == size {
                Ok(output)
            } else {
                Err(DecodeError::Codec {
                    detail: format!("stream does not end at the declared {size} bytes"),
                })
            }
        }
    }
}

fn codec_error(err: DecompressError) -> DecodeError {
    DecodeError::Codec {
        detail: err.to_string(),
    }
}
