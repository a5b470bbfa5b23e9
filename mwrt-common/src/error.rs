//! Common error types for the rule-of-thumb service

use thiserror::Error;

/// Common result type for configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or validating service configuration
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config file could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required setting is absent from every source
    #[error("{0} not set in environment variables or config file")]
    Missing(&'static str),

    /// A setting is present but unusable
    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// Several problems found in one validation pass
    #[error("Configuration error:\n  {}", join_errors(.0))]
    Multiple(Vec<Error>),
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n  ")
}
