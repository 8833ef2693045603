//! Error types for the ORD gateway

use std::io;

use thiserror::Error;

/// Result type alias for the ORD gateway
pub type Result<T> = std::result::Result<T, Error>;

/// ORD gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Certificate or trust store error
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Metadata resolution failure. Displays as the bare message because
    /// the message is served verbatim as the HTTP 500 response body.
    #[error("{0}")]
    Metadata(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_error_displays_as_bare_message() {
        let err = Error::Metadata("bad format".to_string());
        assert_eq!(err.to_string(), "bad format");
    }

    #[test]
    fn config_error_is_prefixed() {
        let err = Error::Config("missing trust anchors".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing trust anchors");
    }
}
