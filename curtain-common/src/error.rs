//! Common error types for Curtain

use thiserror::Error;

/// Common result type for Curtain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Curtain crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let io: Error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(io, Error::Io(_)));
        assert_eq!(io.to_string(), "IO error: denied");

        let config = Error::Config("Parse curtain.toml failed".to_string());
        assert_eq!(config.to_string(), "Configuration error: Parse curtain.toml failed");
    }
}
