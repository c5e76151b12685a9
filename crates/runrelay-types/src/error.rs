use std::fmt;

/// Result type for runrelay-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the schema layer
#[derive(Debug)]
pub enum Error {
    /// Timestamp string not in any accepted producer format
    Timestamp(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timestamp(value) => write!(f, "unrecognized timestamp: {}", value),
        }
    }
}

impl std::error::Error for Error {}
