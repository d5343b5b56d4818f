//! Error types for the registry crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while fetching or decoding a registry snapshot.
///
/// All of them are fatal to a run: without a complete snapshot there is
/// nothing to partition.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(mirrorgen_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(
        code(mirrorgen_registry::http),
        help("Check your network connection and the registry URL")
    )]
    UreqError(#[from] ureq::Error),

    #[error("Failed to fetch registry snapshot: {0}")]
    #[diagnostic(
        code(mirrorgen_registry::fetch_remote),
        help("Verify the registry URL is correct and accessible")
    )]
    FailedToFetchRemote(String),

    #[error("Failed to decode registry snapshot: {0}")]
    #[diagnostic(
        code(mirrorgen_registry::decode),
        help("The registry returned a body that is not a valid index listing")
    )]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    #[diagnostic(
        code(mirrorgen_registry::invalid_url),
        help("Ensure the URL is valid and properly formatted")
    )]
    InvalidUrl(String),
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
