//! Stim-time CSV logger shared by C5 and C6: a bounded
//! `crossbeam_queue::ArrayQueue` fed by producers, drained by one
//! dedicated writer thread.

use crate::metrics::{Event, Metrics};
use crossbeam_queue::ArrayQueue;
use csv::Writer;
use log::warn;
use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

const LOG_QUEUE_CAPACITY: usize = 1000;

/// Renders `stimTimeLog_MMDDYYYY_HHMMSS.csv` for the given epoch-nanosecond
/// timestamp, without pulling in a calendar dependency the rest of the
/// stack doesn't need.
pub fn default_filename(now_ns: u64) -> String {
    let total_secs = (now_ns / 1_000_000_000) as i64;
    let days = total_secs.div_euclid(86_400);
    let secs_of_day = total_secs.rem_euclid(86_400);

    let (year, month, day) = civil_from_days(days);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;

    format!("stimTimeLog_{:02}{:02}{:04}_{:02}{:02}{:02}.csv", month, day, year, hour, minute, second)
}

/// Howard Hinnant's `civil_from_days`: converts a day count since the Unix
/// epoch into a (proleptic Gregorian) `(year, month, day)` triple.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = z.div_euclid(146097);
    let doe = z.rem_euclid(146097); // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32; // [1, 12]
    let year = if m <= 2 { y + 1 } else { y };
    (year, m, d)
}

/// One row of the stim-time CSV log.
#[derive(Debug, Clone, PartialEq)]
pub struct StimTimeRecord {
    pub before_stim_ns: u64,
    pub after_stim_ns: u64,
    pub exception: String,
    pub trigger_phase: f64,
}

/// Shared handle producers use to enqueue a fire record. Cheap to clone.
#[derive(Clone)]
pub struct StimLogHandle {
    queue: Arc<ArrayQueue<StimTimeRecord>>,
    dropped: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
}

impl StimLogHandle {
    /// A handle with no consumer behind it, for the degraded case where the
    /// CSV file itself couldn't be opened. Records queue up and shed once
    /// full, same as any other overflow.
    pub fn disconnected(metrics: Arc<Metrics>) -> Self {
        StimLogHandle {
            queue: Arc::new(ArrayQueue::new(LOG_QUEUE_CAPACITY)),
            dropped: Arc::new(AtomicU64::new(0)),
            metrics,
        }
    }

    /// Enqueues one stim-fire record. Drops with a warning on overflow.
    pub fn record(&self, row: StimTimeRecord) {
        if self.queue.push(row).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.metrics.record(Event::StimLogDropped);
            warn!("stim-time log queue full, dropping record");
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The background CSV writer. `filename` follows the source's
/// `stimTimeLog_MMDDYYYY_HHMMSS.csv` convention; callers pass an
/// already-formatted name (the formatting of the timestamp is the caller's
/// concern so this module has no wall-clock dependency).
pub struct StimLogWriter {
    handle: StimLogHandle,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl StimLogWriter {
    pub fn start(path: &str, metrics: Arc<Metrics>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = Writer::from_writer(file);
        writer.write_record(["BeforeStim", "AfterStim", "Exception", "triggerPhase"])?;
        writer.flush()?;

        let queue = Arc::new(ArrayQueue::new(LOG_QUEUE_CAPACITY));
        let dropped = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let thread_queue = queue.clone();
        let thread_running = running.clone();
        let join = std::thread::Builder::new()
            .name("stim-log-writer".into())
            .spawn(move || {
                while thread_running.load(Ordering::Relaxed) || !thread_queue.is_empty() {
                    match thread_queue.pop() {
                        Some(row) => {
                            let _ = writer.write_record(&[
                                row.before_stim_ns.to_string(),
                                row.after_stim_ns.to_string(),
                                row.exception,
                                row.trigger_phase.to_string(),
                            ]);
                            let _ = writer.flush();
                        }
                        None => std::thread::sleep(std::time::Duration::from_millis(5)),
                    }
                }
            })
            .expect("failed to spawn stim-log-writer thread");

        Ok(StimLogWriter {
            handle: StimLogHandle { queue, dropped, metrics },
            running,
            join: Some(join),
        })
    }

    pub fn handle(&self) -> StimLogHandle {
        self.handle.clone()
    }
}

impl Drop for StimLogWriter {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
