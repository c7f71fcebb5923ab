//! Archive trailer.
//!
//! The last 32 bytes of a GPK file are a packed record:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 12 | `"STKFile0PIDX"` |
//! | 12 | 4 | index blob length (LE) |
//! | 16 | 16 | `"STKFile0PACKFILE"` |
//!
//! The index blob sits immediately before the trailer.

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::FormatError;
use crate::{Error, Result};

/// First trailer signature.
pub const TRAILER_IDENT0: &[u8] = b"STKFile0PIDX";

/// Second trailer signature.
pub const TRAILER_IDENT1: &[u8] = b"STKFile0PACKFILE";

/// Archive trailer (fixed 32-byte tail structure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Must start with [`TRAILER_IDENT0`]
    pub sig0: [u8; 12],
    /// Byte length of the index blob
    pub pidx_length: u32,
    /// Must start with [`TRAILER_IDENT1`]
    pub sig1: [u8; 16],
}

impl Trailer {
    /// Size of the trailer in bytes.
    pub const SIZE: u64 = 32;

    /// Read the trailer from its fields in file order.
    ///
    /// Signatures are not checked; see [`Trailer::validate`].
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut sig0 = [0u8; 12];
        reader.read_exact(&mut sig0)?;
        let pidx_length = reader.read_u32::<LittleEndian>()?;
        let mut sig1 = [0u8; 16];
        reader.read_exact(&mut sig1)?;

        Ok(Self {
            sig0,
            pidx_length,
            sig1,
        })
    }

    /// Check both signatures.
    ///
    /// Only the length of each literal is compared, so bytes after it in the
    /// fixed buffer are ignored.
    pub fn validate(&self) -> std::result::Result<(), FormatError> {
        if !self.sig0.starts_with(TRAILER_IDENT0) {
            return Err(FormatError::BadSignature { field: "sig0" });
        }
        if !self.sig1.starts_with(TRAILER_IDENT1) {
            return Err(FormatError::BadSignature { field: "sig1" });
        }
        Ok(())
    }

    /// Absolute byte range of the index blob in a file of `file_len` bytes.
    pub fn index_range(&self, file_len: u64) -> std::result::Result<Range<u64>, FormatError> {
        let end = file_len
            .checked_sub(Self::SIZE)
            .ok_or_else(|| FormatError::Truncated {
                detail: format!("file is {file_len} bytes, trailer needs {}", Self::SIZE),
            })?;
        let start = end
            .checked_sub(self.pidx_length as u64)
            .ok_or_else(|| FormatError::Truncated {
                detail: format!(
                    "index length {} exceeds the {end} bytes before the trailer",
                    self.pidx_length
                ),
            })?;
        Ok(start..end)
    }
}

/// Locate and validate the trailer of a `file_len`-byte source.
///
/// Returns the trailer together with the absolute range of the index blob.
pub fn read_trailer<R: Read + Seek>(source: &mut R, file_len: u64) -> Result<(Trailer, Range<u64>)> {
    let start = file_len
        .checked_sub(Trailer::SIZE)
        .ok_or_else(|| FormatError::Truncated {
            detail: format!("file is {file_len} bytes, trailer needs {}", Trailer::SIZE),
        })?;

    source.seek(SeekFrom::Start(start))?;
    let trailer = Trailer::read_from(source).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Format(FormatError::Truncated {
            detail: "short read of trailer".to_string(),
        }),
        _ => Error::Io(e),
    })?;

    trailer.validate()?;
    let range = trailer.index_range(file_len)?;
    Ok((trailer, range))
}
