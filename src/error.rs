//! Error taxonomy for the loader.
//!
//! Errors fall into four groups:
//! - **open-time** failures abort construction of a [`ParquetLoader`](crate::ParquetLoader)
//!   (bad stream, unreadable metadata, unsupported schema shape);
//! - **configuration** failures (zero block size, too many blocks);
//! - **read** failures surface from the cursor advance that triggered a physical read,
//!   always carrying the offending column path;
//! - **caller-contract** violations (reading before the first advance, reading an
//!   inactive column, reading a null through a strict integer column).
//!
//! Degraded conversions (96-bit identifier overflow, permutation allocation failure)
//! are absorbed and logged; they never show up here.

use parquet::errors::ParquetError;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input stream must be positioned at offset zero, found position {position}")]
    StreamNotAtStart { position: u64 },

    #[error("failed to read parquet metadata: {0}")]
    Metadata(#[source] ParquetError),

    #[error("unsupported schema shape at '{path}': {reason}")]
    UnsupportedSchema { path: String, reason: String },

    #[error("duplicate flattened column path '{0}'")]
    DuplicateColumn(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to decode column '{column}': {source}")]
    Decode {
        column: String,
        #[source]
        source: ParquetError,
    },

    #[error(
        "column '{column}' produced {actual} rows in row group {row_group}, expected {expected}"
    )]
    ColumnLengthMismatch {
        column: String,
        row_group: usize,
        expected: usize,
        actual: usize,
    },

    #[error("cursor is not positioned on a row")]
    InvalidState,

    #[error("column {0} is not active in this cursor")]
    ColumnNotActive(usize),

    #[error("column index {index} is out of range for a schema of {len} columns")]
    UnknownColumn { index: usize, len: usize },

    #[error("null value read through integer column '{column}'")]
    NullValue { column: String },

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("shared parquet reader lock poisoned")]
    LockPoisoned,
}
