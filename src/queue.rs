//! Bounded Stream Queue (C1): fixed-capacity single-producer/single-consumer
//! queue with overflow-drop and wake-one signaling.
//!
//! A bounded `crossbeam::channel` already gives blocking `recv` on empty and
//! non-blocking `try_send` with drop-on-full; dropping the sender wakes
//! every blocked consumer, which covers the shutdown semantics this
//! component needs.

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of a `push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    Accepted,
    Dropped,
}

/// Producer handle. Only the ingest orchestrator (or, for telemetry
/// streams, the callback translating an `onXChanged` event) holds one of
/// these per stream.
pub struct StreamProducer<T> {
    tx: Sender<T>,
    name: &'static str,
    dropped: Arc<AtomicU64>,
}

/// Consumer handle, owned by the stream's dedicated writer thread.
pub struct StreamConsumer<T> {
    rx: Receiver<T>,
}

/// Creates a bounded, named stream queue. `name` is used only in the
/// overflow warning so operators can tell which stream is shedding data.
pub fn stream<T>(name: &'static str, capacity: usize) -> (StreamProducer<T>, StreamConsumer<T>) {
    let (tx, rx) = bounded(capacity);
    (
        StreamProducer {
            tx,
            name,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        StreamConsumer { rx },
    )
}

impl<T> StreamProducer<T> {
    /// Non-blocking enqueue. On a full queue, drops `msg` and logs a
    /// single-line warning — the hot callback path must never block on a
    /// slow subscriber.
    pub fn push(&self, msg: T) -> PushResult {
        match self.tx.try_send(msg) {
            Ok(()) => PushResult::Accepted,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("queue overflow: stream '{}' is full, dropping message", self.name);
                PushResult::Dropped
            }
            Err(TrySendError::Disconnected(_)) => PushResult::Dropped,
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Clone for StreamProducer<T> {
    fn clone(&self) -> Self {
        StreamProducer {
            tx: self.tx.clone(),
            name: self.name,
            dropped: self.dropped.clone(),
        }
    }
}

impl<T> StreamConsumer<T> {
    /// Blocks until a message is available or every producer has been
    /// dropped (engine-wide shutdown / stream disable), in which case
    /// `None` is returned — the terminal sentinel for an ended stream.
    pub fn pop(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Non-blocking variant used by writer loops that need to poll a
    /// shutdown flag between waits.
    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(v) => Some(v),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
