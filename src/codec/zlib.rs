//! zlib `compress` and `uncompress`.
//!
//! Inline DMR++ payloads (`dmrpp:missingdata` and compressed `dmrpp:vlsa` values) are zlib streams whose decoded size is known in advance.
//! Failures are reported with the zlib return code a C implementation would have produced, so messages stay comparable across DMR++ tools.

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression, Decompress, FlushDecompress, Status};
use thiserror::Error;

/// A zlib return code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ZlibReturnCode {
    /// `Z_STREAM_ERROR` (-2).
    StreamError,
    /// `Z_DATA_ERROR` (-3).
    DataError,
    /// `Z_MEM_ERROR` (-4).
    MemError,
    /// `Z_BUF_ERROR` (-5).
    BufError,
}

impl ZlibReturnCode {
    /// Return the numeric zlib return code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::StreamError => -2,
            Self::DataError => -3,
            Self::MemError => -4,
            Self::BufError => -5,
        }
    }

    /// Return the symbolic zlib name of the return code.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StreamError => "Z_STREAM_ERROR",
            Self::DataError => "Z_DATA_ERROR",
            Self::MemError => "Z_MEM_ERROR",
            Self::BufError => "Z_BUF_ERROR",
        }
    }
}

impl std::fmt::Display for ZlibReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

/// A zlib error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ZlibError {
    /// Compression failed.
    #[error("failed to compress {source_size} bytes, retval: {code}")]
    Compress {
        /// The zlib return code.
        code: ZlibReturnCode,
        /// The size of the source.
        source_size: usize,
    },
    /// Decompression failed.
    #[error("failed to decompress payload, retval: {code}, expected size: {expected_size}")]
    Uncompress {
        /// The zlib return code.
        code: ZlibReturnCode,
        /// The expected decompressed size.
        expected_size: usize,
    },
    /// The decompressed size does not match the expected size.
    #[error("decompressed size {actual_size} does not match expected size {expected_size}")]
    SizeMismatch {
        /// The decompressed size.
        actual_size: usize,
        /// The expected decompressed size.
        expected_size: usize,
    },
}

impl ZlibError {
    /// Return the zlib return code, if the error came from zlib itself.
    #[must_use]
    pub fn return_code(&self) -> Option<ZlibReturnCode> {
        match self {
            Self::Compress { code, .. } | Self::Uncompress { code, .. } => Some(*code),
            Self::SizeMismatch { .. } => None,
        }
    }
}

/// Compress `source` into a zlib stream with the default compression level.
///
/// # Errors
/// Returns [`ZlibError::Compress`] if the encoder fails.
pub fn compress(source: &[u8]) -> Result<Vec<u8>, ZlibError> {
    let err = |_| ZlibError::Compress {
        code: ZlibReturnCode::StreamError,
        source_size: source.len(),
    };
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(source).map_err(err)?;
    encoder.finish().map_err(err)
}

/// Decompress the zlib stream `source`, which must decode to exactly `expected_size` bytes.
///
/// The output is allocated once at the expected size.
///
/// # Errors
/// Returns [`ZlibError::Uncompress`] if `source` is not a valid zlib stream, is truncated, or the output cannot be allocated,
/// and [`ZlibError::SizeMismatch`] if it decodes to a different size.
pub fn uncompress(source: &[u8], expected_size: usize) -> Result<Vec<u8>, ZlibError> {
    let mem_error = ZlibError::Uncompress {
        code: ZlibReturnCode::MemError,
        expected_size,
    };
    // One extra byte of room distinguishes "too large" from "exactly full".
    let capacity = expected_size.checked_add(1).ok_or_else(|| mem_error.clone())?;
    let mut out = Vec::new();
    out.try_reserve_exact(capacity).map_err(|_| mem_error)?;
    let mut decompress = Decompress::new(true);
    match decompress.decompress_vec(source, &mut out, FlushDecompress::Finish) {
        Ok(Status::StreamEnd) if out.len() == expected_size => Ok(out),
        Ok(Status::StreamEnd) => Err(ZlibError::SizeMismatch {
            actual_size: out.len(),
            expected_size,
        }),
        Ok(Status::Ok | Status::BufError) => Err(ZlibError::Uncompress {
            code: ZlibReturnCode::BufError,
            expected_size,
        }),
        Err(_) => Err(ZlibError::Uncompress {
            code: ZlibReturnCode::DataError,
            expected_size,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_round_trip() {
        let source: Vec<u8> = (0..1000u32).flat_map(|i| (i % 17).to_le_bytes()).collect();
        let compressed = compress(&source).unwrap();
        assert!(compressed.len() < source.len());
        assert_eq!(uncompress(&compressed, source.len()).unwrap(), source);
    }

    #[test]
    fn zlib_round_trip_empty() {
        let compressed = compress(&[]).unwrap();
        assert_eq!(uncompress(&compressed, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn zlib_size_mismatch() {
        let compressed = compress(b"abcdefgh").unwrap();
        assert_eq!(
            uncompress(&compressed, 4),
            Err(ZlibError::Uncompress {
                code: ZlibReturnCode::BufError,
                expected_size: 4
            })
        );
        assert_eq!(
            uncompress(&compressed, 20),
            Err(ZlibError::SizeMismatch {
                actual_size: 8,
                expected_size: 20
            })
        );
    }

    #[test]
    fn zlib_data_error() {
        let err = uncompress(b"definitely not zlib", 10).unwrap_err();
        assert_eq!(err.return_code(), Some(ZlibReturnCode::DataError));
        assert!(err.to_string().contains("-3 (Z_DATA_ERROR)"));
    }

    #[test]
    fn zlib_unallocatable_size() {
        let compressed = compress(b"abc").unwrap();
        for expected_size in [usize::MAX, usize::MAX / 2 + 1] {
            let err = uncompress(&compressed, expected_size).unwrap_err();
            assert_eq!(err.return_code(), Some(ZlibReturnCode::MemError));
        }
    }
}
