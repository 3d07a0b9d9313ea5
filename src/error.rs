//! Error types

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type
///
/// Only recoverable conditions are represented here. Contract violations,
/// such as a verifier-role object being asked to produce a reply or a
/// challenge exceeding its declared bit length, are bugs in the calling code
/// and panic instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed data parsed from untrusted bytes
    #[error("malformed byte tree: {0}")]
    Format(&'static str),

    /// A message that was expected on the bulletin board is missing
    #[error("no message labelled {label:?} from party {party}")]
    Absent {
        /// Index of the party that should have published the message
        party: usize,
        /// Label of the missing message
        label: String,
    },

    /// An audited quantity does not match its recomputed value
    #[error("verification failed at step {0:?}")]
    Mismatch(&'static str),

    /// I/O failure reading or writing a persisted proof artifact
    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in an externally supplied key or ciphertext list
    #[error("malformed json")]
    Json(#[from] serde_json::Error),
}
