//! Error types for the MPQ library

use std::io;
use thiserror::Error;

/// Result type alias for MPQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MPQ operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// The operation being performed
        operation: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// Invalid MPQ format or corrupted archive
    #[error("Invalid MPQ format: {0}")]
    InvalidFormat(String),

    /// Unsupported MPQ version
    #[error("Unsupported MPQ format version: {0} (only V1 and V2 are supported)")]
    UnsupportedVersion(u16),

    /// Unsupported compression method mask
    #[error("Unsupported compression method: 0x{0:02X}")]
    UnsupportedCompression(u8),

    /// Compression/decompression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// Checksum mismatch on a sector or trailing CRC
    #[error("Checksum mismatch for {file}: expected 0x{expected:08X}, got 0x{actual:08X}")]
    ChecksumMismatch {
        /// File or sector description
        file: String,
        /// Expected checksum
        expected: u32,
        /// Actual checksum
        actual: u32,
    },

    /// File not found in archive
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Hash table has no free slot left
    #[error("Hash table full")]
    HashTableFull,

    /// File is shadowed by a deletion marker in a patch archive
    #[error("File marked for deletion in patch: {0}")]
    MarkedForDeletion(String),
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Annotate an I/O error with the operation that produced it
    pub fn io<S: Into<String>>(operation: S, source: io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Check if this error indicates a corrupted archive
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_) | Error::ChecksumMismatch { .. }
        )
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io {
            operation: "file access".to_string(),
            source,
        }
    }
}
