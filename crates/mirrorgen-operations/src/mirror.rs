//! Fetch, partition and publish a whole registry listing.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use mirrorgen_core::{
    artifact::{ArtifactHandle, ArtifactSink},
    batch::{partition, Batch},
    error::BatchError,
    manifest::{duplicate_ids, synthesize, ManifestTemplate},
    publish::Publisher,
};
use mirrorgen_events::{BatchStage, MirrorEvent};
use mirrorgen_registry::{fetch_snapshot, RegistryEntry};
use tracing::{debug, info, warn};

use crate::{
    dispatch::dispatch,
    types::{DispatchOptions, FailedInfo, MirrorReport, PublishedInfo},
    CancelSignal, MirrorContext, MirrorError, MirrorResult,
};

/// Fetches the snapshot from the configured registry and mirrors every entry.
///
/// Fetch and decode errors are fatal; nothing is written in that case.
pub async fn mirror(
    ctx: &MirrorContext,
    template: ManifestTemplate,
    sink: Arc<dyn ArtifactSink>,
    publisher: Arc<dyn Publisher>,
    cancel: CancelSignal,
) -> MirrorResult<MirrorReport> {
    if cancel.is_cancelled() {
        return Err(MirrorError::Cancelled);
    }

    let url = ctx.config().registry_url().to_string();
    ctx.events().emit(MirrorEvent::SnapshotFetching {
        url: url.clone(),
    });
    info!("Fetching registry snapshot from {}", url);

    let fetch = tokio::task::spawn_blocking(move || fetch_snapshot(&url));
    let snapshot = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
        result = fetch => {
            result.map_err(|err| MirrorError::Custom(format!("Join handle error: {err}")))??
        }
    };

    ctx.events().emit(MirrorEvent::SnapshotFetched {
        rows: snapshot.len() as u64,
        total_rows: snapshot.total_rows,
    });
    if snapshot.is_empty() {
        warn!("Registry returned an empty listing, nothing to mirror");
    }

    let total_rows = snapshot.total_rows;
    mirror_entries(
        ctx,
        snapshot.into_entries(),
        total_rows,
        template,
        sink,
        publisher,
        cancel,
    )
    .await
}

/// Mirrors an already loaded listing.
///
/// Entries are partitioned by the configured batch size and every batch runs
/// synthesize, write and publish on its own task.
pub async fn mirror_entries(
    ctx: &MirrorContext,
    entries: Vec<RegistryEntry>,
    total_rows: u64,
    template: ManifestTemplate,
    sink: Arc<dyn ArtifactSink>,
    publisher: Arc<dyn Publisher>,
    cancel: CancelSignal,
) -> MirrorResult<MirrorReport> {
    let snapshot_rows = entries.len();
    if total_rows != snapshot_rows as u64 {
        debug!(
            total_rows,
            snapshot_rows, "registry row count differs from listing length"
        );
    }

    let batch_size = ctx.config().batch_size();
    let batches = partition(entries, batch_size)?;
    let batch_count = batches.len();

    ctx.events().emit(MirrorEvent::Partitioned {
        batches: batch_count as u32,
        batch_size,
    });
    info!(
        "Partitioned {} entries into {} packages of up to {}",
        snapshot_rows, batch_count, batch_size
    );

    let options = DispatchOptions {
        max_in_flight: ctx.config().max_in_flight(),
        cancel,
    };

    let template = Arc::new(template);
    let duplicates = Arc::new(AtomicUsize::new(0));
    let run_batch = {
        let events = ctx.events().clone();
        let template = template.clone();
        let duplicates = duplicates.clone();

        move |batch: Batch<RegistryEntry>| -> Result<ArtifactHandle, BatchError> {
            let name = template.package_name(batch.index);
            let enter = |stage: BatchStage| {
                events.emit(MirrorEvent::BatchStage {
                    index: batch.index,
                    name: name.clone(),
                    stage,
                });
            };

            enter(BatchStage::Synthesizing);
            let manifest = synthesize(&batch, &template);

            let repeated = duplicate_ids(&batch);
            if !repeated.is_empty() {
                warn!(
                    "{}: {} duplicate ids collapsed ({})",
                    name,
                    repeated.len(),
                    repeated.join(", ")
                );
                duplicates.fetch_add(repeated.len(), Ordering::Relaxed);
            }

            enter(BatchStage::Writing);
            let handle = sink.write(&batch, &manifest)?;

            enter(BatchStage::Publishing);
            publisher.publish(&handle)?;

            events.emit(MirrorEvent::BatchComplete {
                index: batch.index,
                name: name.clone(),
            });
            Ok(handle)
        }
    };

    let report = dispatch(batches, &options, ctx.events(), run_batch).await;

    let published = report
        .completed
        .into_iter()
        .map(|(index, handle)| {
            PublishedInfo {
                index,
                name: handle.name,
                path: handle.path,
            }
        })
        .collect();

    let failed = report
        .failed
        .into_iter()
        .map(|failure| {
            FailedInfo {
                index: failure.index,
                name: template.package_name(failure.index),
                output: failure.error.output().map(String::from),
                error: failure.error.to_string(),
            }
        })
        .collect();

    Ok(MirrorReport {
        snapshot_rows,
        total_rows,
        batches: batch_count,
        published,
        failed,
        cancelled: report.cancelled,
        duplicate_ids: duplicates.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use mirrorgen_config::config::Config;
    use mirrorgen_core::{
        artifact::{FsArtifactSink, MANIFEST_FILE},
        manifest::PackageManifest,
        publish::SkipPublisher,
    };
    use mirrorgen_events::{CollectorSink, EventSinkHandle};
    use tempfile::tempdir;

    use super::*;

    struct FailingPublisher {
        fail_on: &'static str,
    }

    impl Publisher for FailingPublisher {
        fn publish(&self, handle: &ArtifactHandle) -> Result<(), BatchError> {
            if handle.name == self.fail_on {
                return Err(BatchError::Publish {
                    name: handle.name.clone(),
                    exit_code: Some(1),
                    output: "E409 conflict".to_string(),
                });
            }
            Ok(())
        }
    }

    fn context(batch_size: usize) -> (MirrorContext, Arc<CollectorSink>) {
        let mut config = Config::default_config();
        config.batch_size = Some(batch_size);
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();
        (MirrorContext::new(config, events), collector)
    }

    fn entries(ids: &[&str]) -> Vec<RegistryEntry> {
        ids.iter()
            .map(|id| RegistryEntry::new(*id, *id, "1-x"))
            .collect()
    }

    fn template() -> ManifestTemplate {
        ManifestTemplate::new("pkg", "1.0.0", "tester").unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mirror_entries_writes_every_batch() {
        let dir = tempdir().unwrap();
        let (ctx, collector) = context(2);

        let report = mirror_entries(
            &ctx,
            entries(&["a", "b", "c", "d", "e"]),
            5,
            template(),
            Arc::new(FsArtifactSink::new(dir.path())),
            Arc::new(SkipPublisher),
            CancelSignal::new(),
        )
        .await
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.batches, 3);
        assert_eq!(report.snapshot_rows, 5);
        assert_eq!(
            report
                .published
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>(),
            ["pkg-0", "pkg-1", "pkg-2"]
        );

        let written = fs::read_to_string(dir.path().join("pkg-2").join(MANIFEST_FILE)).unwrap();
        let manifest = PackageManifest::from_json(&written).unwrap();
        assert_eq!(manifest.dependencies.keys().collect::<Vec<_>>(), ["e"]);

        assert_eq!(
            collector.count(|event| matches!(event, MirrorEvent::BatchComplete { .. })),
            3
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mirror_entries_reports_publish_failure() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(1);

        let report = mirror_entries(
            &ctx,
            entries(&["a", "b", "c"]),
            3,
            template(),
            Arc::new(FsArtifactSink::new(dir.path())),
            Arc::new(FailingPublisher {
                fail_on: "pkg-1",
            }),
            CancelSignal::new(),
        )
        .await
        .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.published.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert_eq!(report.failed[0].name, "pkg-1");
        assert_eq!(report.failed[0].output.as_deref(), Some("E409 conflict"));
        assert!(dir.path().join("pkg-1").join(MANIFEST_FILE).exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mirror_entries_reports_write_failure() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pkg-1"), "not a package directory").unwrap();
        let (ctx, collector) = context(2);

        let report = mirror_entries(
            &ctx,
            entries(&["a", "b", "c", "d", "e"]),
            5,
            template(),
            Arc::new(FsArtifactSink::new(dir.path())),
            Arc::new(SkipPublisher),
            CancelSignal::new(),
        )
        .await
        .unwrap();

        assert!(!report.is_success());
        assert_eq!(
            report
                .published
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>(),
            ["pkg-0", "pkg-2"]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert_eq!(report.failed[0].name, "pkg-1");
        assert!(report.failed[0].error.ends_with("is not a directory"));
        assert!(report.failed[0].output.is_none());
        assert!(dir.path().join("pkg-1").is_file());

        assert_eq!(
            collector.count(|event| matches!(event, MirrorEvent::BatchFailed { index: 1, .. })),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mirror_entries_counts_duplicates() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(3);

        let report = mirror_entries(
            &ctx,
            entries(&["a", "a", "b", "c", "c", "c"]),
            6,
            template(),
            Arc::new(FsArtifactSink::new(dir.path())),
            Arc::new(SkipPublisher),
            CancelSignal::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.duplicate_ids, 2);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_mirror_entries_zero_batch_size_is_fatal() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(0);

        let err = mirror_entries(
            &ctx,
            entries(&["a"]),
            1,
            template(),
            Arc::new(FsArtifactSink::new(dir.path())),
            Arc::new(SkipPublisher),
            CancelSignal::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MirrorError::Core(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_mirror_entries_cancelled_writes_nothing() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(1);
        let cancel = CancelSignal::new();
        cancel.cancel();

        let report = mirror_entries(
            &ctx,
            entries(&["a", "b"]),
            2,
            template(),
            Arc::new(FsArtifactSink::new(dir.path())),
            Arc::new(SkipPublisher),
            cancel,
        )
        .await
        .unwrap();

        assert_eq!(report.cancelled, [0, 1]);
        assert!(report.published.is_empty());
        assert!(!report.is_success());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_mirror_cancelled_during_fetch() {
        let (ctx, _) = context(1);
        let cancel = CancelSignal::new();
        cancel.cancel();

        let err = mirror(
            &ctx,
            template(),
            Arc::new(FsArtifactSink::new("/nonexistent")),
            Arc::new(SkipPublisher),
            cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MirrorError::Cancelled));
    }
}
