//! Error types for locus.

use crate::ids::ObjectId;
use thiserror::Error;

/// Errors that can occur during database and query operations.
#[derive(Debug, Error)]
pub enum LocusError {
    /// Lookup of an identifier that is not (or no longer) in the database.
    /// Recoverable; the caller decides how to proceed.
    #[error("object not found: {id}")]
    ObjectNotFound { id: ObjectId },

    /// Insertion with a pre-assigned identifier that is already live.
    #[error("identifier {id} is already in use")]
    DuplicateIdentifier { id: ObjectId },

    /// The identifier space is exhausted; no further insertions are possible.
    #[error("identifier space exhausted")]
    CapacityExhausted,

    /// Mutation of a structure that declared itself static after
    /// materialization. Fatal to the call, never retried.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Invalid parameter value (non-positive k, partition count <= 1,
    /// dimensionality mismatch, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unresolvable setup, detected at construction time rather than
    /// deferred to first use.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for locus operations.
pub type Result<T> = std::result::Result<T, LocusError>;
