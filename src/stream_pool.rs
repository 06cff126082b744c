//! Stream Writer Pool (C8): one thread per enabled stream kind, draining
//! its bounded queue (C1) into the downstream RPC writer. The neural
//! stream additionally batches before writing; every other telemetry kind
//! writes one message at a time. Each kind is an instance of the same
//! generic component rather than a hand-spread set of per-kind fields.

use crate::queue::{stream, PushResult, StreamProducer};
use crate::sample::EnrichedSample;
use crate::vendor::StreamWriter;
use log::warn;
use std::thread::JoinHandle;

/// A single telemetry (non-neural) stream: one queue, one writer thread.
/// `enable<Kind>Stream(false)` drops the producer, which unblocks the
/// writer thread's `pop()` with `None` and lets it exit; `disable` then
/// joins it.
pub struct StreamHandle<T: Send + 'static> {
    producer: StreamProducer<T>,
    join: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> StreamHandle<T> {
    pub fn spawn<W>(name: &'static str, capacity: usize, writer: W) -> Self
    where
        W: StreamWriter<T> + 'static,
    {
        let (producer, consumer) = stream::<T>(name, capacity);

        let join = std::thread::Builder::new()
            .name(format!("stream-writer-{name}"))
            .spawn(move || {
                while let Some(msg) = consumer.pop() {
                    if let Err(e) = writer.write(msg) {
                        warn!("stream '{name}' write failed: {e}");
                    }
                }
            })
            .expect("failed to spawn stream writer thread");

        StreamHandle {
            producer,
            join: Some(join),
        }
    }

    pub fn push(&self, msg: T) -> PushResult {
        self.producer.push(msg)
    }

    /// Disables the stream: drops the producer (unblocking the writer's
    /// `pop`) and joins the thread.
    pub fn disable(mut self) {
        // Dropping `self.producer` happens automatically at end of scope;
        // joining must happen after that drop, so take the handle first
        // and let `self` (holding the producer) drop when this fn returns.
        if let Some(join) = self.join.take() {
            drop(std::mem::replace(&mut self.producer, make_dummy_producer()));
            let _ = join.join();
        }
    }
}

fn make_dummy_producer<T>() -> StreamProducer<T> {
    stream::<T>("disabled", 1).0
}

/// The neural stream's dedicated handle: batches up to `batch_size`
/// enriched samples before calling the writer, flushing any partial batch
/// when the stream is disabled.
pub struct NeuralStreamHandle {
    producer: StreamProducer<EnrichedSample>,
    join: Option<JoinHandle<()>>,
}

impl NeuralStreamHandle {
    pub fn spawn<W>(capacity: usize, batch_size: usize, writer: W) -> Self
    where
        W: StreamWriter<Vec<EnrichedSample>> + 'static,
    {
        let (producer, consumer) = stream::<EnrichedSample>("neural", capacity);

        let join = std::thread::Builder::new()
            .name("stream-writer-neural".into())
            .spawn(move || {
                let mut batch: Vec<EnrichedSample> = Vec::with_capacity(batch_size);
                loop {
                    match consumer.pop() {
                        Some(sample) => {
                            batch.push(sample);
                            if batch.len() >= batch_size {
                                let to_send = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                                if let Err(e) = writer.write(to_send) {
                                    warn!("neural stream write failed: {e}");
                                }
                            }
                        }
                        None => {
                            if !batch.is_empty() {
                                let to_send = std::mem::take(&mut batch);
                                if let Err(e) = writer.write(to_send) {
                                    warn!("neural stream final flush failed: {e}");
                                }
                            }
                            break;
                        }
                    }
                }
            })
            .expect("failed to spawn neural stream writer thread");

        NeuralStreamHandle {
            producer,
            join: Some(join),
        }
    }

    pub fn push(&self, sample: EnrichedSample) -> PushResult {
        self.producer.push(sample)
    }

    pub fn disable(mut self) {
        if let Some(join) = self.join.take() {
            drop(std::mem::replace(
                &mut self.producer,
                stream::<EnrichedSample>("disabled", 1).0,
            ));
            let _ = join.join();
        }
    }
}
