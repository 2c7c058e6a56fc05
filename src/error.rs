use std::fmt;
use thiserror::Error;

/// The error type for awsign operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required credential field is blank or missing
    CredentialIncomplete,

    /// No provider produced credentials
    CredentialNotFound,

    /// Payload hashing received an input kind it cannot hash
    PayloadUnsupported,

    /// Request cannot be signed (unparsable URL, bad header value, etc.)
    RequestInvalid,

    /// Configuration error (unreadable profile file, invalid values)
    ConfigInvalid,

    /// Unexpected errors (I/O, internal invariants, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Check if this is a credential error
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CredentialIncomplete | ErrorKind::CredentialNotFound
        )
    }
}

// Convenience constructors
impl Error {
    /// Create an incomplete credential error
    pub fn credential_incomplete(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialIncomplete, message)
    }

    /// Create a credential not found error
    pub fn credential_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialNotFound, message)
    }

    /// Create an unsupported payload error
    pub fn payload_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadUnsupported, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CredentialIncomplete => write!(f, "incomplete credentials"),
            ErrorKind::CredentialNotFound => write!(f, "no credentials available"),
            ErrorKind::PayloadUnsupported => write!(f, "unsupported payload kind"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
