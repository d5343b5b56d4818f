//! Registry index snapshots for mirrorgen.
//!
//! This crate knows how to download the registry's "all documents" listing and
//! turn it into an ordered [`Snapshot`] of [`RegistryEntry`] values.
//!
//! # Example
//!
//! ```no_run
//! use mirrorgen_registry::fetch_snapshot;
//!
//! fn count_entries(url: &str) -> mirrorgen_registry::Result<usize> {
//!     let snapshot = fetch_snapshot(url)?;
//!     Ok(snapshot.entries.len())
//! }
//! ```

pub mod error;
pub mod fetch;
pub mod http_client;
pub mod snapshot;

pub use error::{ErrorContext, RegistryError, Result};
pub use fetch::{fetch_snapshot, read_snapshot};
pub use snapshot::{RegistryEntry, Snapshot};
