//! Error types for ipban.

use thiserror::Error;

use crate::policy::RejectionReason;
use crate::record::BanId;

/// Error type for ipban operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed address input
    #[error("invalid address: {0}")]
    Parse(#[from] ParseError),

    /// Policy violation, reported verbatim to the caller
    #[error("ban rejected: {0}")]
    Rejected(RejectionReason),

    /// Operation referenced an unknown ban
    #[error("ban not found: {0}")]
    NotFound(BanId),

    /// Timeout or connectivity failure talking to the store
    #[error("transient store failure: {0}")]
    TransientStore(String),

    /// Lost a create race against another writer
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientStore(_) | Error::ConcurrencyConflict(_))
    }

    /// The policy rejection carried by this error, if any.
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Error::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Result type alias for ipban operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for address parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank input
    #[error("empty address")]
    Empty,

    /// Address part is not a valid IPv4 or IPv6 address
    #[error("malformed address: {0}")]
    InvalidAddress(String),

    /// Prefix part is not a number
    #[error("malformed prefix length: {0}")]
    InvalidPrefix(String),

    /// Prefix exceeds the family's address width
    #[error("prefix length /{prefix} out of range (max /{max})")]
    PrefixOutOfRange { prefix: u8, max: u8 },
}

/// Error type for store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The call did not finish within the configured bound
    #[error("store call timed out")]
    Timeout,

    /// Connectivity or backend failure
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Another writer committed a conflicting record
    #[error("conflicting write: {0}")]
    Conflict(String),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => Error::ConcurrencyConflict(msg),
            other => Error::TransientStore(other.to_string()),
        }
    }
}

/// Error type for audit sink notifications.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The sink could not record the event
    #[error("audit sink failed: {0}")]
    Sink(String),
}
