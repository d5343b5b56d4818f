/// All event types emitted while mirroring a registry.
#[derive(Debug, Clone)]
pub enum MirrorEvent {
    /// Snapshot request is about to be sent.
    SnapshotFetching { url: String },
    /// Snapshot was downloaded and decoded.
    SnapshotFetched { rows: u64, total_rows: u64 },
    /// Snapshot was split into batches.
    Partitioned { batches: u32, batch_size: usize },
    /// A batch moved to a new stage.
    BatchStage {
        index: usize,
        name: String,
        stage: BatchStage,
    },
    /// A batch was written and (if enabled) published.
    BatchComplete { index: usize, name: String },
    /// A batch failed; siblings keep running.
    BatchFailed { index: usize, error: String },
    /// Overall progress across all batches.
    BatchProgress {
        completed: u32,
        total: u32,
        failed: u32,
    },
    /// Cancellation was observed; `pending` batches will not start.
    Cancelled { pending: u32 },
}

/// Per-batch stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    /// Building the package manifest.
    Synthesizing,
    /// Writing manifest and stub files.
    Writing,
    /// Running the publish command.
    Publishing,
}

impl BatchStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Synthesizing => "synthesizing",
            Self::Writing => "writing",
            Self::Publishing => "publishing",
        }
    }
}
