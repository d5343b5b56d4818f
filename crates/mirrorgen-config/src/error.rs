use miette::Diagnostic;
use mirrorgen_utils::error::{PathError, UtilsError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(mirrorgen_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Failed to read configuration file: {0}")]
    #[diagnostic(code(mirrorgen_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Invalid batch size: {0}")]
    #[diagnostic(
        code(mirrorgen_config::invalid_batch_size),
        help("batch_size must be at least 1")
    )]
    InvalidBatchSize(usize),

    #[error("Invalid duration: {0}")]
    #[diagnostic(
        code(mirrorgen_config::invalid_duration),
        help("Use a compact duration such as `30s`, `10m` or `1h30m`")
    )]
    InvalidDuration(String),

    #[error("Invalid registry URL: {0}")]
    #[diagnostic(
        code(mirrorgen_config::invalid_registry_url),
        help("The registry URL must be an absolute http(s) URL")
    )]
    InvalidRegistryUrl(String),

    #[error("Publish command is empty")]
    #[diagnostic(
        code(mirrorgen_config::empty_publish_command),
        help("Set publish_command to something like `npm publish`, or disable publishing")
    )]
    EmptyPublishCommand,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Utils(#[from] UtilsError),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
