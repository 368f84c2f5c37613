//! Error types for png-structure

use crate::{chunk::ChunkType, tiff::TiffError};
use std::io;

/// Result type for png-structure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, editing or writing PNG chunk streams
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Signature mismatch or other whole-file format problem
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The stream ended, or a chunk claimed more bytes than the stream holds
    #[error("Truncated at offset {offset}: {reason}")]
    Truncated { offset: u64, reason: String },

    /// Chunk type bytes are not four ASCII letters
    #[error("Invalid chunk type {bytes:02x?} at offset {offset}")]
    InvalidChunkType { offset: u64, bytes: [u8; 4] },

    /// A chunk is structurally valid but its payload is not
    #[error("Invalid {chunk_type} chunk at offset {offset}: {reason}")]
    InvalidChunk {
        offset: u64,
        chunk_type: ChunkType,
        reason: String,
    },

    /// Stored CRC does not match the chunk contents (only raised when verification is enabled)
    #[error(
        "CRC mismatch in {chunk_type} chunk at offset {offset}: stored {expected:#010x}, computed {actual:#010x}"
    )]
    CrcMismatch {
        offset: u64,
        chunk_type: ChunkType,
        expected: u32,
        actual: u32,
    },

    /// Declared length and payload size disagree (in-memory state is corrupt)
    #[error("{chunk_type} chunk declares {declared} bytes but holds {actual}")]
    LengthMismatch {
        chunk_type: ChunkType,
        declared: u32,
        actual: usize,
    },

    /// No eXIf chunk present
    #[error("EXIF data not found")]
    ExifNotFound,

    /// The TIFF codec rejected the eXIf payload
    #[error("EXIF {operation} failed for eXIf chunk at index {index}: {source}")]
    Exif {
        operation: &'static str,
        index: usize,
        #[source]
        source: TiffError,
    },

    /// Tag codec error outside of an eXIf chunk operation (e.g. building a tag tree)
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// The chunk sequence is empty, so there is no header chunk to insert after
    #[error("No header chunk to anchor the eXIf chunk after")]
    MissingHeaderChunk,

    /// Data size exceeds maximum allowed
    #[error("Data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: usize, max: usize },
}

impl Error {
    /// True when the error only signals that no eXIf chunk exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ExifNotFound)
    }
}
