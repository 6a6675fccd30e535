//! Error types for the caress-raw crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// End of file and preliminary end of file are not errors; they are reported
/// through [`ParseStatus`](crate::caress::types::models::ParseStatus).
#[derive(Debug, Error)]
pub enum CaressError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The data file does not exist or cannot be opened for reading.
    #[error("Cannot open data file {}: {source}", path.display())]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A 512-byte block could not be read in full.
    #[error("Block {block} is truncated or missing")]
    Truncated { block: u64 },

    /// A payload spans more blocks than the scratch area may hold.
    #[error("Payload spans {blocks} blocks, more than the maximum of {max}")]
    PayloadTooLarge { blocks: u64, max: u64 },

    /// The token stream violates the data description grammar.
    #[error("Malformed data unit: {0}")]
    MalformedUnit(String),

    /// A type code outside the closed set of known codes.
    #[error("Unsupported type code: {0}")]
    UnsupportedType(i8),

    /// A descriptor definition names more keys than an element may carry.
    #[error("Descriptor {element} defines more than {max} keys")]
    TooManyKeys { element: String, max: usize },

    /// The unit handed in was not produced by the most recent `next_unit` call.
    #[error("Data unit is stale: the session has advanced past it")]
    StaleCursor,

    /// A partition request reaches past the end of the unit's payload.
    #[error("Partition [{start}, {start}+{count}) exceeds the {available} available items")]
    PartitionOutOfRange { start: u64, count: u64, available: u64 },

    /// A re-read was requested on a session opened without monitoring.
    #[error("Re-read requires a session opened in monitoring mode")]
    NotMonitoring,
}

impl CaressError {
    /// Whether the error closes the session to further parsing.
    ///
    /// Grammar violations leave the token stream at an unknown position, so
    /// every following `next_unit` call reports end of file. All other errors
    /// only fail the call that produced them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaressError::MalformedUnit(_))
    }
}

/// A convenience `Result` type alias using the crate's `CaressError` type.
pub type Result<T> = std::result::Result<T, CaressError>;
