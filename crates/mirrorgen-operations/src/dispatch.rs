//! Concurrent fan-out of batches with a join barrier.

use std::{
    any::Any,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
};

use mirrorgen_core::{batch::Batch, error::BatchError};
use mirrorgen_events::{EventSinkHandle, MirrorEvent};
use tokio::{sync::Semaphore, task::JoinError};
use tracing::{debug, warn};

use crate::types::{DispatchOptions, DispatchReport, FailedBatch};

/// Runs `per_batch` on every batch on the blocking pool and waits for all of them.
///
/// A failing or panicking batch is recorded with its index; it never stops
/// its siblings. Once `options.cancel` is raised no further batch starts,
/// including ones already queued for a blocking thread, and the remaining
/// indices are reported as cancelled.
pub async fn dispatch<T, R, F>(
    batches: Vec<Batch<T>>,
    options: &DispatchOptions,
    events: &EventSinkHandle,
    per_batch: F,
) -> DispatchReport<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Batch<T>) -> Result<R, BatchError> + Send + Sync + 'static,
{
    let total = batches.len();
    debug!(
        count = total,
        max_in_flight = ?options.max_in_flight,
        "dispatching batches"
    );

    let per_batch = Arc::new(per_batch);
    let semaphore = options
        .max_in_flight
        .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

    let completed = Arc::new(Mutex::new(Vec::new()));
    let failed = Arc::new(Mutex::new(Vec::new()));
    // batches that were queued for a blocking thread when the signal was raised
    let skipped = Arc::new(Mutex::new(Vec::new()));
    let mut cancelled = Vec::new();

    let done_count = Arc::new(AtomicU32::new(0));
    let failed_count = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::with_capacity(total);

    for batch in batches {
        if options.cancel.is_cancelled() {
            cancelled.push(batch.index);
            continue;
        }

        let permit = match &semaphore {
            Some(semaphore) => {
                tokio::select! {
                    biased;
                    _ = options.cancel.cancelled() => {
                        cancelled.push(batch.index);
                        continue;
                    }
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            cancelled.push(batch.index);
                            continue;
                        }
                    },
                }
            }
            None => None,
        };

        let index = batch.index;
        let per_batch = per_batch.clone();
        let cancel = options.cancel.clone();
        let events = events.clone();
        let completed = completed.clone();
        let failed = failed.clone();
        let skipped = skipped.clone();
        let done_count = done_count.clone();
        let failed_count = failed_count.clone();
        let total = total as u32;

        let handle = tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(per_batch(batch))
            })
            .await;

            let outcome = match result {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    skipped.lock().unwrap().push(index);
                    return;
                }
                Err(err) => Err(join_error(err)),
            };

            match outcome {
                Ok(output) => completed.lock().unwrap().push((index, output)),
                Err(err) => {
                    debug!(batch = index, "batch failed: {}", err);
                    events.emit(MirrorEvent::BatchFailed {
                        index,
                        error: err.to_string(),
                    });
                    failed_count.fetch_add(1, Ordering::Relaxed);
                    failed.lock().unwrap().push(FailedBatch {
                        index,
                        error: err,
                    });
                }
            }

            let done = done_count.fetch_add(1, Ordering::Relaxed) + 1;
            events.emit(MirrorEvent::BatchProgress {
                completed: done,
                total,
                failed: failed_count.load(Ordering::Relaxed),
            });

            drop(permit);
        });
        handles.push((index, handle));
    }

    if !cancelled.is_empty() {
        debug!(
            pending = cancelled.len(),
            "cancelled, waiting for running batches to finish"
        );
    }

    for (index, handle) in handles {
        if let Err(err) = handle.await {
            failed.lock().unwrap().push(FailedBatch {
                index,
                error: join_error(err),
            });
        }
    }

    let mut completed = std::mem::take(&mut *completed.lock().unwrap());
    let mut failed = std::mem::take(&mut *failed.lock().unwrap());
    cancelled.append(&mut skipped.lock().unwrap());
    completed.sort_by_key(|(index, _)| *index);
    failed.sort_by_key(|failure| failure.index);
    cancelled.sort_unstable();

    if !cancelled.is_empty() {
        warn!(pending = cancelled.len(), "cancelled before all batches ran");
        events.emit(MirrorEvent::Cancelled {
            pending: cancelled.len() as u32,
        });
    }

    debug!(
        completed = completed.len(),
        failed = failed.len(),
        cancelled = cancelled.len(),
        "dispatch finished"
    );

    DispatchReport {
        completed,
        failed,
        cancelled,
        total,
    }
}

fn join_error(err: JoinError) -> BatchError {
    if err.is_panic() {
        BatchError::Panicked(panic_message(err.into_panic()))
    } else {
        BatchError::Panicked(err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::AtomicUsize,
        thread,
        time::Duration,
    };

    use mirrorgen_core::batch::partition;
    use mirrorgen_events::{CollectorSink, NullSink};

    use super::*;
    use crate::CancelSignal;

    fn null_events() -> EventSinkHandle {
        Arc::new(NullSink)
    }

    fn publish_error(index: usize) -> BatchError {
        BatchError::Publish {
            name: format!("pkg-{index}"),
            exit_code: Some(1),
            output: String::new(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_all_succeed() {
        let batches = partition((0..10).collect::<Vec<u32>>(), 3).unwrap();

        let report = dispatch(
            batches,
            &DispatchOptions::default(),
            &null_events(),
            |batch| Ok(batch.entries.iter().sum::<u32>()),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.total, 4);
        assert_eq!(report.completed, vec![(0, 3), (1, 12), (2, 21), (3, 9)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_failures_do_not_stop_siblings() {
        let batches = partition((0..20).collect::<Vec<u32>>(), 2).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();

        let report = dispatch(
            batches,
            &DispatchOptions::default(),
            &null_events(),
            move |batch| {
                counter.fetch_add(1, Ordering::SeqCst);
                if batch.index % 3 == 0 {
                    Err(publish_error(batch.index))
                } else {
                    Ok(batch.index)
                }
            },
        )
        .await;

        assert_eq!(ran.load(Ordering::SeqCst), 10);
        assert_eq!(report.completed.len(), 6);
        assert_eq!(
            report.failed.iter().map(|f| f.index).collect::<Vec<_>>(),
            [0, 3, 6, 9]
        );
        assert!(report.cancelled.is_empty());
        assert!(!report.is_success());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_respects_max_in_flight() {
        let batches = partition((0..24).collect::<Vec<u32>>(), 1).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let options = DispatchOptions {
            max_in_flight: Some(3),
            ..Default::default()
        };
        let (running_in, peak_in) = (running.clone(), peak.clone());
        let report = dispatch(batches, &options, &null_events(), move |_batch| {
            let now = running_in.fetch_add(1, Ordering::SeqCst) + 1;
            peak_in.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(15));
            running_in.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(report.is_success());
        assert_eq!(report.completed.len(), 24);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_cancelled_before_start() {
        let batches = partition((0..5).collect::<Vec<u32>>(), 1).unwrap();
        let options = DispatchOptions::default();
        options.cancel.cancel();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let report = dispatch(batches, &options, &null_events(), move |_batch| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(report.completed.is_empty());
        assert_eq!(report.cancelled, [0, 1, 2, 3, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_cancel_mid_run_lets_running_batch_finish() {
        let batches = partition((0..6).collect::<Vec<u32>>(), 1).unwrap();
        let cancel = CancelSignal::new();
        let options = DispatchOptions {
            max_in_flight: Some(1),
            cancel: cancel.clone(),
        };

        let report = dispatch(batches, &options, &null_events(), move |batch| {
            if batch.index == 0 {
                cancel.cancel();
                thread::sleep(Duration::from_millis(10));
            }
            Ok(batch.index)
        })
        .await;

        assert_eq!(report.completed, vec![(0, 0)]);
        assert_eq!(report.cancelled, [1, 2, 3, 4, 5]);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_dispatch_unbounded_cancel_skips_queued_batches() {
        // a single blocking thread keeps every other batch queued behind the first one
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap();

        let batches = partition((0..6).collect::<Vec<u32>>(), 1).unwrap();
        let cancel = CancelSignal::new();
        let options = DispatchOptions {
            max_in_flight: None,
            cancel: cancel.clone(),
        };
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let report = runtime.block_on(dispatch(batches, &options, &events, move |batch| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(50));
                cancel.cancel();
            }
            Ok(batch.index)
        }));

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.cancelled.len(), 5);
        assert!(report.failed.is_empty());
        assert!(!report.is_success());

        let mut accounted: Vec<usize> = report
            .completed
            .iter()
            .map(|(index, _)| *index)
            .chain(report.cancelled.iter().copied())
            .collect();
        accounted.sort_unstable();
        assert_eq!(accounted, [0, 1, 2, 3, 4, 5]);

        assert_eq!(
            collector.count(|event| matches!(event, MirrorEvent::Cancelled { pending: 5 })),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_isolates_panics() {
        let batches = partition((0..4).collect::<Vec<u32>>(), 1).unwrap();

        let report = dispatch(
            batches,
            &DispatchOptions::default(),
            &null_events(),
            |batch| {
                if batch.index == 2 {
                    panic!("boom in batch two");
                }
                Ok(batch.index)
            },
        )
        .await;

        assert_eq!(report.completed.len(), 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 2);
        match &report.failed[0].error {
            BatchError::Panicked(message) => assert_eq!(message, "boom in batch two"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_emits_progress_events() {
        let batches = partition((0..3).collect::<Vec<u32>>(), 1).unwrap();
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();

        dispatch(batches, &DispatchOptions::default(), &events, |batch| {
            if batch.index == 1 {
                Err(publish_error(1))
            } else {
                Ok(())
            }
        })
        .await;

        let events = collector.events();
        let progress: Vec<(u32, u32)> = events
            .iter()
            .filter_map(|event| {
                match event {
                    MirrorEvent::BatchProgress {
                        completed,
                        total,
                        ..
                    } => Some((*completed, *total)),
                    _ => None,
                }
            })
            .collect();
        assert_eq!(progress.len(), 3);
        assert!(progress.iter().all(|(_, total)| *total == 3));
        assert_eq!(progress.iter().map(|(c, _)| *c).max(), Some(3));

        assert_eq!(
            collector.count(|event| matches!(event, MirrorEvent::BatchFailed { index: 1, .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_dispatch_empty() {
        let report = dispatch(
            Vec::<Batch<u32>>::new(),
            &DispatchOptions::default(),
            &null_events(),
            |_batch| Ok(()),
        )
        .await;
        assert_eq!(report.total, 0);
        assert!(report.is_success());
    }
}
