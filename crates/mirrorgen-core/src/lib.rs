use error::CoreError;

pub mod artifact;
pub mod batch;
pub mod error;
pub mod manifest;
pub mod publish;

pub type CoreResult<T> = std::result::Result<T, CoreError>;
