//! Small helpers shared across the mirrorgen crates.
//!
//! Nothing in here knows about registries or batches; it only wraps the
//! filesystem, environment and string parsing chores the other crates need.

pub mod error;
pub mod fs;
pub mod path;
pub mod time;
