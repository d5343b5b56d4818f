pub mod cancel;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod mirror;
pub mod types;

pub use cancel::CancelSignal;
pub use context::MirrorContext;
pub use error::{MirrorError, MirrorResult};
pub use types::*;
