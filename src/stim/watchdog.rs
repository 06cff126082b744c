//! Open-Loop Watchdog (C6): alternate stim driver that retriggers on a
//! fixed interval instead of being phase-locked. Spin-waits on
//! `is_stimulating`, fires, timestamps, sleeps the configured interval,
//! repeats — a failed fire is recorded but never stops the loop.

use crate::metrics::{Event, Metrics};
use crate::stim::stim_log::{StimLogHandle, StimTimeRecord};
use crate::vendor::VendorImplant;
use log::warn;
use spin_sleep::SpinSleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thread_priority::ThreadBuilderExt;
use thread_priority::ThreadPriority::Max;

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

pub struct OpenLoopWatchdog {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl OpenLoopWatchdog {
    /// `interval_ms` is clamped to a 10ms floor.
    pub fn spawn(
        implant: Arc<dyn VendorImplant>,
        log: StimLogHandle,
        interval_ms: u64,
        metrics: Arc<Metrics>,
    ) -> Self {
        let interval = Duration::from_millis(interval_ms.max(10));
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let builder = std::thread::Builder::new().name("open-loop-watchdog".into());
        let join = builder
            .spawn_with_priority(Max, move |_| {
                let sleeper = SpinSleeper::default();
                while thread_running.load(Ordering::Relaxed) {
                    while implant.is_stimulating() && thread_running.load(Ordering::Relaxed) {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    if !thread_running.load(Ordering::Relaxed) {
                        break;
                    }

                    let before = now_ns();
                    let result = implant.start_stimulation();
                    let after = now_ns();
                    if let Err(e) = &result {
                        metrics.record(Event::VendorException);
                        warn!("open-loop vendor stimulation exception: {e}");
                    }

                    log.record(StimTimeRecord {
                        before_stim_ns: before,
                        after_stim_ns: after,
                        exception: crate::error::VendorError::as_log_text(&result),
                        trigger_phase: 0.0,
                    });

                    sleeper.sleep(interval);
                }
            })
            .expect("failed to spawn open-loop-watchdog thread");

        OpenLoopWatchdog {
            running,
            join: Some(join),
        }
    }

    pub fn shutdown(mut self, implant: &dyn VendorImplant) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        if let Err(e) = implant.stop_stimulation() {
            warn!("vendor stop_stimulation failed during teardown: {e}");
        }
    }
}
