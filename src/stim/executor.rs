//! Stim Trigger Executor (C5): a dedicated worker woken by the phase-locked
//! controller's trigger predicate; issues the actual stimulation call,
//! timestamps it, and records the attempt. Waits on a condvar, fires,
//! records before/after timestamps and any failure, and loops until
//! disarmed.

use crate::metrics::{Event, Metrics};
use crate::stim::stim_log::{StimLogHandle, StimTimeRecord};
use crate::vendor::VendorImplant;
use log::warn;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};
use thread_priority::ThreadPriority::Max;
use thread_priority::ThreadBuilderExt;

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// The condvar-backed signal the stim controller notifies on a valid
/// trigger. `pending` also carries the trigger phase at the moment of
/// signaling, so the executor logs the phase that actually fired it.
pub struct StimSignal {
    pending: Mutex<Option<f64>>,
    condvar: Condvar,
}

impl Default for StimSignal {
    fn default() -> Self {
        StimSignal {
            pending: Mutex::new(None),
            condvar: Condvar::new(),
        }
    }
}

impl StimSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Called by the orchestrator when the controller's trigger predicate
    /// fires. At most one notify per tick.
    pub fn notify(&self, trigger_phase: f64) {
        let mut pending = self.pending.lock();
        *pending = Some(trigger_phase);
        self.condvar.notify_one();
    }
}

/// C5 worker handle; disarming joins the thread.
pub struct StimExecutor {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl StimExecutor {
    /// Spawned on closed-loop arming. Blocks on `signal` until notified or
    /// disarmed; each fire calls the vendor's blocking `start_stimulation`
    /// and logs `(before, after, exception, trigger_phase)`.
    pub fn spawn(
        implant: Arc<dyn VendorImplant>,
        signal: Arc<StimSignal>,
        log: StimLogHandle,
        metrics: Arc<Metrics>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let builder = std::thread::Builder::new().name("stim-executor".into());
        let join = builder
            .spawn_with_priority(Max, move |_| loop {
                let trigger_phase = {
                    let mut pending = signal.pending.lock();
                    while pending.is_none() && thread_running.load(Ordering::Relaxed) {
                        signal.condvar.wait(&mut pending);
                    }
                    if !thread_running.load(Ordering::Relaxed) && pending.is_none() {
                        break;
                    }
                    pending.take().unwrap_or(0.0)
                };

                let before = now_ns();
                let result = implant.start_stimulation();
                let after = now_ns();
                if let Err(e) = &result {
                    metrics.record(Event::VendorException);
                    warn!("vendor stimulation exception: {e}");
                }

                log.record(StimTimeRecord {
                    before_stim_ns: before,
                    after_stim_ns: after,
                    exception: crate::error::VendorError::as_log_text(&result),
                    trigger_phase,
                });
            })
            .expect("failed to spawn stim-executor thread");

        StimExecutor {
            running,
            join: Some(join),
        }
    }

    /// Disarm: stop the vendor stimulation, wake the worker, and join it.
    pub fn shutdown(mut self, implant: &dyn VendorImplant, signal: &StimSignal) {
        self.running.store(false, Ordering::Relaxed);
        {
            let mut pending = signal.pending.lock();
            // Leave `pending` as-is; the wake alone is enough to observe
            // `running == false` and exit.
            let _ = &mut pending;
        }
        signal.condvar.notify_one();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        if let Err(e) = implant.stop_stimulation() {
            warn!("vendor stop_stimulation failed during teardown: {e}");
        }
    }
}
