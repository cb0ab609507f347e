use std::fmt;

/// Unified error type for key encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed or truncated key bytes (bad tag, premature end, missing hybrid time).
    Corruption(String),
    /// Well-formed input the caller should not have passed (e.g. trailing bytes
    /// after a full decode).
    InvalidInput(String),
    /// Two doc keys with differing hash presence were compared. Keys of one table
    /// either all carry a hash or none do.
    HashPresenceMismatch,
}

impl Error {
    /// Prepend context to the message, keeping the error class.
    pub fn context(self, what: impl fmt::Display) -> Self {
        match self {
            Error::Corruption(msg) => Error::Corruption(format!("{what}: {msg}")),
            Error::InvalidInput(msg) => Error::InvalidInput(format!("{what}: {msg}")),
            Error::HashPresenceMismatch => Error::HashPresenceMismatch,
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Corruption(msg) => write!(f, "Corruption: {msg}"),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Error::HashPresenceMismatch => {
                write!(f, "Precondition violated: compared doc keys with differing hash presence")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
