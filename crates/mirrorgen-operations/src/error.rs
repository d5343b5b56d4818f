use miette::Diagnostic;
use mirrorgen_config::error::ConfigError;
use mirrorgen_core::error::CoreError;
use mirrorgen_registry::RegistryError;
use mirrorgen_utils::error::FileSystemError;
use thiserror::Error;

/// Errors that abort a run before or instead of dispatching batches.
#[derive(Error, Diagnostic, Debug)]
pub enum MirrorError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error("Cancelled before any batch was dispatched")]
    #[diagnostic(code(mirrorgen::cancelled))]
    Cancelled,

    #[error("{0}")]
    #[diagnostic(code(mirrorgen::error))]
    Custom(String),
}

pub type MirrorResult<T> = std::result::Result<T, MirrorError>;
