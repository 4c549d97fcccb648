//! Error types for the deserialization engine
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! All four engine errors are fatal to the `deserialize` call that raised
//! them: none represent a transient condition, and none corrupt the shared
//! migration registry (registry reads during a failed resolution are
//! non-mutating). `UnresolvedDependency` is distinguished in that it can only
//! occur after every object in the stream already reached its migrated state.

use crate::key::ClassKey;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the deserialization engine
#[derive(Debug, Error)]
pub enum Error {
    /// A class named in the stream, or named by a rename edge, has no live
    /// definition and no module-load hook that could supply one.
    #[error("class not found: {key}")]
    ClassNotFound {
        /// The key that could not be loaded
        key: ClassKey,
    },

    /// Rename-edge resolution revisited a class already seen for the same
    /// object, so the chain can never terminate.
    #[error("rename cycle detected: resolution of {origin} revisited {via}")]
    CycleDetected {
        /// Key the resolution started from
        origin: ClassKey,
        /// Key at which the walk closed the loop
        via: ClassKey,
    },

    /// The rename/transform chain exhausted without reaching the live
    /// class's declared identity and version. This indicates a registration
    /// bug rather than a data problem.
    #[error(
        "migration incomplete: expected {expected} at version {expected_version}, \
         reached {actual} at version {actual_version}"
    )]
    MigrationIncomplete {
        /// Identity of the live class the caller asked for
        expected: ClassKey,
        /// Version the live class declares
        expected_version: u64,
        /// Identity the migration chain actually terminated at
        actual: ClassKey,
        /// Version the migration chain actually reached
        actual_version: u64,
    },

    /// The initializer scheduler exceeded its round cap with coroutines
    /// still pending. Lists every object whose initializer never finished.
    #[error("initializers did not converge after {rounds} rounds; stuck: [{}]", stuck.join(", "))]
    UnresolvedDependency {
        /// Number of full rounds the scheduler ran before giving up
        rounds: usize,
        /// One entry per stuck object: its class key and stream position
        stuck: Vec<String>,
    },

    /// Byte-stream decode error
    #[error("stream decode error: {0}")]
    Decode(String),

    /// Byte-stream encode error
    #[error("stream encode error: {0}")]
    Encode(String),

    /// A restored attribute map was structurally unusable (dangling
    /// back-reference, wrong value shape for a required attribute, ...)
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Encode(e.to_string())
    }
}
