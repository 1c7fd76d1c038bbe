//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (layout table construction,
//! bit-level payload access, snapshot persistence).
use std::path::PathBuf;

use thiserror::Error;

use crate::core::Channel;

//==================================================================================LAYOUT_ERROR
#[derive(Debug, Error)]
/// Configuration errors detected while building a layout table.
pub enum LayoutError {
    /// Identifier does not fit in 29 bits.
    #[error("Invalid CAN identifier {id:#X}")]
    InvalidIdentifier { id: u32 },
    /// Two layouts claim the same identifier.
    #[error("Duplicate layout for identifier {id:#X}")]
    DuplicateIdentifier { id: u32 },
    /// Layout without any field.
    #[error("Layout {id:#X} has no field")]
    EmptyLayout { id: u32 },
    /// Field width is zero or the field reaches past the 8-byte payload.
    #[error("Field {channel} of layout {id:#X} is out of bounds")]
    FieldOutOfBounds { id: u32, channel: Channel },
    /// Raw integer wider than an `f64` mantissa; decoding would round it.
    #[error("Field {channel} of layout {id:#X} is {bits} bits wide, at most {max} decode exactly")]
    FieldTooWide {
        id: u32,
        channel: Channel,
        bits: u32,
        max: u32,
    },
    /// Scale or offset is NaN or infinite.
    #[error("Field {channel} of layout {id:#X} has a non-finite scale or offset")]
    InvalidScale { id: u32, channel: Channel },
    /// Same channel decoded by two entries.
    #[error("Channel {channel} defined by both {first:#X} and {second:#X}")]
    DuplicateChannel {
        channel: Channel,
        first: u32,
        second: u32,
    },
    /// Manifest is not valid JSON or does not match the layout schema.
    #[error("Invalid layout manifest: {0}")]
    ParseJson(#[from] serde_json::Error),
    /// Manifest file could not be read.
    #[error("Failed to read layout manifest {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//==================================================================================BITREADER_ERRORS
#[derive(Debug, Error, PartialEq, Eq)]
/// Errors raised during bitwise buffer reads.
pub enum BitReaderError {
    /// Attempted to read past the end of the buffer.
    #[error("Attempted to read out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
    /// Requested more bits than the target type can hold.
    #[error("Cannot read more than {max} bits. Requested: {asked}")]
    TooLongForType { max: u8, asked: u8 },
    /// Cursor is not aligned on a byte boundary when required.
    #[error("Non aligned bit. Cursor: {cursor}")]
    NonAlignedBit { cursor: usize },
}

//==================================================================================PERSIST_ERROR
#[derive(Debug, Error)]
/// Failures reported by a persistence sink.
pub enum PersistError {
    /// Temporary file creation, write, or sync failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Record could not be encoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Atomic rename over the target failed.
    #[error("Failed to replace {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
    /// Sink-specific failure.
    #[error("{0}")]
    Other(String),
}
