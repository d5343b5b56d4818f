use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender},
    Mutex,
};

use crate::MirrorEvent;

/// Receives run events from the operations layer.
///
/// Called from worker threads, so implementations must not block for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MirrorEvent);
}

/// Forwards events over a std channel to a renderer thread.
///
/// Once the receiver is gone every later event is dropped without touching
/// the channel again.
pub struct ChannelSink {
    sender: Sender<MirrorEvent>,
    closed: AtomicBool,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<MirrorEvent>) {
        let (sender, receiver) = mpsc::channel();
        let sink = Self {
            sender,
            closed: AtomicBool::new(false),
        };
        (sink, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: MirrorEvent) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        if self.sender.send(event).is_err() {
            self.closed.store(true, Ordering::Relaxed);
        }
    }
}

/// Discards everything. Used when progress output is off.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: MirrorEvent) {}
}

/// Keeps every event in emission order.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<MirrorEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<MirrorEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&MirrorEvent) -> bool,
    {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| predicate(event))
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: MirrorEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_closes_after_receiver_drop() {
        let (sink, rx) = ChannelSink::new();
        sink.emit(MirrorEvent::Cancelled {
            pending: 1,
        });
        assert!(!sink.closed.load(Ordering::Relaxed));
        assert_eq!(rx.try_iter().count(), 1);

        drop(rx);
        sink.emit(MirrorEvent::Cancelled {
            pending: 2,
        });
        assert!(sink.closed.load(Ordering::Relaxed));

        sink.emit(MirrorEvent::Cancelled {
            pending: 3,
        });
        assert!(sink.closed.load(Ordering::Relaxed));
    }
}
