//! Error types for the SizeCeph erasure code backend

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the SizeCeph backend
///
/// Every failure category is a distinct variant so hosts can tell a policy
/// rejection apart from a transform-level refusal or a backend fault.
#[derive(Error, Debug)]
pub enum Error {
    /// Profile disagrees with the fixed K/M layout
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external transform could not be loaded
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Malformed shard set, misaligned input or unknown chunk size
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Policy gate rejected the decode before asking the transform
    #[error("Insufficient shards for safe decode: have {available}, need {required}")]
    InsufficientShards { available: usize, required: usize },

    /// The transform's capability probe refused this hole pattern
    #[error("Transform cannot restore erasure pattern (missing shards {missing:?})")]
    UnsupportedPattern { missing: Vec<usize> },

    /// The transform's restore call reported failure
    #[error("Reconstruction failed: restore returned {code}")]
    ReconstructionFailed { code: i32 },

    /// Operation category not implemented by this backend
    #[error("Operation not supported by this backend: {operation}")]
    Unsupported { operation: &'static str },

    /// Placement rule collaborator error
    #[error("Placement rule error: {0}")]
    Placement(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the host can expect the call to succeed later without
    /// reconfiguration (more shards arriving, different recovery strategy).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientShards { .. } | Error::UnsupportedPattern { .. }
        )
    }

    /// Negative errno as returned across the plugin boundary.
    pub fn errno(&self) -> i32 {
        const EIO: i32 = 5;
        const ENOENT: i32 = 2;
        const EINVAL: i32 = 22;
        const ENOTSUP: i32 = 95;

        match self {
            Error::Configuration(_) | Error::InvalidRequest(_) | Error::Placement(_) => -EINVAL,
            Error::BackendUnavailable(_) => -ENOENT,
            Error::InsufficientShards { .. } | Error::ReconstructionFailed { .. } => -EIO,
            Error::UnsupportedPattern { .. } | Error::Unsupported { .. } => -ENOTSUP,
            Error::Io(e) => -e.raw_os_error().unwrap_or(EIO),
        }
    }
}
