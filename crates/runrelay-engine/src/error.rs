use std::fmt;

/// Result type for runrelay-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the publisher
#[derive(Debug)]
pub enum Error {
    /// Backend boundary error, propagated unretried
    Client(runrelay_client::Error),

    /// Producer events arrived outside their nesting contract
    OutOfOrder(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Client(err) => write!(f, "Client error: {}", err),
            Error::OutOfOrder(msg) => write!(f, "Out-of-order event: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Client(err) => Some(err),
            Error::OutOfOrder(_) => None,
        }
    }
}

impl From<runrelay_client::Error> for Error {
    fn from(err: runrelay_client::Error) -> Self {
        Error::Client(err)
    }
}
