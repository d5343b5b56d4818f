use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, Arc, LazyLock},
    time::Duration,
};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use mirrorgen_events::MirrorEvent;
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};

use crate::utils::{Colored, Icons};

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

/// Owns the background progress thread started by [`spawn_event_handler`].
///
/// The [`MirrorContext`](mirrorgen_operations::MirrorContext) holding the
/// channel sender must be dropped before calling [`finish`](ProgressGuard::finish).
pub struct ProgressGuard {
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ProgressGuard {
    /// Wait for the event handler thread to drain remaining events.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap()
}

fn batch_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix}  {wide_bar:.cyan/dim}  {pos}/{len}  {msg}",
    )
    .unwrap()
    .progress_chars("━━─")
}

fn create_spinner(msg: String) -> ProgressBar {
    let pb = MULTI.add(ProgressBar::new_spinner());
    pb.set_style(spinner_style());
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spawn a background thread that maps [`MirrorEvent`]s to indicatif progress bars.
///
/// The overall bar sits at the bottom; every batch in flight gets a spinner
/// above it that is cleared when the batch completes or fails.
pub fn spawn_event_handler(receiver: Receiver<MirrorEvent>) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut fetch_job: Option<ProgressBar> = None;
        let mut overall: Option<ProgressBar> = None;
        let mut jobs: HashMap<usize, ProgressBar> = HashMap::new();
        let mut names: HashMap<usize, String> = HashMap::new();

        while let Ok(event) = receiver.recv() {
            match event {
                MirrorEvent::SnapshotFetching {
                    url,
                } => {
                    fetch_job = Some(create_spinner(format!("Fetching {url}")));
                }
                MirrorEvent::SnapshotFetched {
                    ..
                } => {
                    if let Some(pb) = fetch_job.take() {
                        pb.finish_and_clear();
                    }
                }
                MirrorEvent::Partitioned {
                    batches, ..
                } => {
                    let pb = MULTI.add(ProgressBar::new(batches as u64));
                    pb.set_style(batch_style());
                    pb.set_prefix(format!("{} Packages", Icons::PACKAGE));
                    pb.enable_steady_tick(Duration::from_millis(100));
                    overall = Some(pb);
                }
                MirrorEvent::BatchStage {
                    index,
                    name,
                    stage,
                } => {
                    let msg = format!("{}: {}", Colored(Cyan, &name), stage.label());
                    match jobs.get(&index) {
                        Some(pb) => pb.set_message(msg),
                        None => {
                            let spinner = ProgressBar::new_spinner();
                            let pb = match &overall {
                                Some(anchor) => MULTI.insert_before(anchor, spinner),
                                None => MULTI.add(spinner),
                            };
                            pb.set_style(spinner_style());
                            pb.set_message(msg);
                            pb.enable_steady_tick(Duration::from_millis(100));
                            jobs.insert(index, pb);
                        }
                    }
                    names.entry(index).or_insert(name);
                }
                MirrorEvent::BatchComplete {
                    index,
                    name,
                } => {
                    MULTI.suspend(|| {
                        eprintln!(" {} {}", Colored(Green, Icons::CHECK), Colored(Cyan, &name));
                    });
                    if let Some(pb) = jobs.remove(&index) {
                        pb.finish_and_clear();
                    }
                    names.remove(&index);
                }
                MirrorEvent::BatchFailed {
                    index,
                    error,
                } => {
                    let name = names
                        .remove(&index)
                        .unwrap_or_else(|| format!("batch {index}"));
                    MULTI.suspend(|| {
                        eprintln!(
                            " {} {}: {}",
                            Colored(Red, Icons::CROSS),
                            Colored(Cyan, &name),
                            Colored(Red, &error)
                        );
                    });
                    if let Some(pb) = jobs.remove(&index) {
                        pb.finish_and_clear();
                    }
                }
                MirrorEvent::BatchProgress {
                    completed,
                    failed,
                    ..
                } => {
                    if let Some(pb) = &overall {
                        pb.set_position(completed as u64);
                        if failed > 0 {
                            pb.set_message(format!("{}", Colored(Red, format!("{failed} failed"))));
                        }
                    }
                }
                MirrorEvent::Cancelled {
                    pending,
                } => {
                    let msg = format!(
                        "{} cancelled, {pending} packages skipped",
                        Icons::WARNING
                    );
                    match &overall {
                        Some(pb) => pb.set_message(format!("{}", Colored(Yellow, msg))),
                        None => create_spinner(msg).finish(),
                    }
                }
            }
        }

        if let Some(pb) = fetch_job.take() {
            pb.finish_and_clear();
        }
        for (_, pb) in jobs {
            pb.finish_and_clear();
        }
        if let Some(pb) = overall.take() {
            pb.finish_and_clear();
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
