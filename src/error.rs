//! Error type shared across the crate.

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Failures surfaced by the index and its block layer.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Any failure from the backing block file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file opened is not an index file of this format.
    #[error("not an index file: {0}")]
    InvalidFormat(String),
    /// On-disk state violates a structural invariant.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// The caller handed in something the index cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
