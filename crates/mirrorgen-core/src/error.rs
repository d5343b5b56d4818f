//! Error types for mirrorgen-core.

use miette::Diagnostic;
use mirrorgen_config::error::ConfigError;
use mirrorgen_utils::error::FileSystemError;
use thiserror::Error;

/// Run-level errors raised before any batch is dispatched.
#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(mirrorgen::invalid_configuration),
        help("Check the command-line arguments and config.toml values")
    )]
    InvalidConfiguration(String),
}

/// Failure of a single batch. Never aborts sibling batches.
#[derive(Error, Diagnostic, Debug)]
pub enum BatchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] FileSystemError),

    #[error("Failed to serialize manifest: {0}")]
    #[diagnostic(code(mirrorgen::batch::serialize))]
    Serialize(#[from] serde_json::Error),

    #[error("Publishing `{name}` failed with {}", exit_label(*exit_code))]
    #[diagnostic(
        code(mirrorgen::batch::publish),
        help("Inspect the publish tool output; the artifact is left on disk for a retry")
    )]
    Publish {
        name: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Failed to run `{command}`: {source}")]
    #[diagnostic(
        code(mirrorgen::batch::spawn),
        help("Make sure the publish command is installed and on PATH")
    )]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Batch task panicked: {0}")]
    #[diagnostic(
        code(mirrorgen::batch::panicked),
        help("This is an internal error, please report it")
    )]
    Panicked(String),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl BatchError {
    /// Captured output of the publish tool, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Publish {
                output, ..
            } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io, path::PathBuf};

    use super::*;

    #[test]
    fn test_publish_error_display() {
        let err = BatchError::Publish {
            name: "pkg-3".to_string(),
            exit_code: Some(1),
            output: "E403 forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "Publishing `pkg-3` failed with exit code 1");
        assert_eq!(err.output(), Some("E403 forbidden"));

        let err = BatchError::Publish {
            name: "pkg-3".to_string(),
            exit_code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
        assert!(err.output().is_none());
    }

    #[test]
    fn test_io_error_is_transparent() {
        let err: BatchError = FileSystemError::File {
            path: PathBuf::from("/out/pkg-0/package.json"),
            action: "write",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(err.to_string().contains("/out/pkg-0/package.json"));
    }

    #[test]
    fn test_invalid_configuration_display() {
        let err = CoreError::InvalidConfiguration("batch size must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: batch size must be at least 1"
        );
    }
}
