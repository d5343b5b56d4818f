use std::path::PathBuf;

use mirrorgen_core::error::BatchError;

// ---- Dispatch ----

/// Options for a dispatch run.
#[derive(Debug, Default, Clone)]
pub struct DispatchOptions {
    /// Upper bound on batches running at once. `None` spawns every batch.
    pub max_in_flight: Option<usize>,
    pub cancel: crate::CancelSignal,
}

/// A batch whose task returned an error or panicked.
#[derive(Debug)]
pub struct FailedBatch {
    pub index: usize,
    pub error: BatchError,
}

/// Outcome of every batch handed to the dispatcher.
///
/// All three lists are sorted by batch index.
#[derive(Debug)]
pub struct DispatchReport<R> {
    pub completed: Vec<(usize, R)>,
    pub failed: Vec<FailedBatch>,
    pub cancelled: Vec<usize>,
    pub total: usize,
}

impl<R> DispatchReport<R> {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }
}

// ---- Mirror ----

/// Report returned after a mirror run completes.
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Rows received in the snapshot.
    pub snapshot_rows: usize,
    /// Row count the registry claims to hold.
    pub total_rows: u64,
    pub batches: usize,
    pub published: Vec<PublishedInfo>,
    pub failed: Vec<FailedInfo>,
    pub cancelled: Vec<usize>,
    /// Repeated ids collapsed while synthesizing manifests.
    pub duplicate_ids: usize,
}

impl MirrorReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }
}

/// Info about a successfully written (and published) package.
#[derive(Debug)]
pub struct PublishedInfo {
    pub index: usize,
    pub name: String,
    pub path: PathBuf,
}

/// Info about a failed batch.
#[derive(Debug)]
pub struct FailedInfo {
    pub index: usize,
    pub name: String,
    pub error: String,
    /// Output captured from the publish tool.
    pub output: Option<String>,
}
