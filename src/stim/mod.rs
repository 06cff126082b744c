//! Stimulation triggering and execution: C4 (phase-locked controller), C5
//! (closed-loop executor), C6 (open-loop watchdog), and the shared CSV
//! stim-time logger.

pub mod controller;
pub mod executor;
pub mod stim_log;
pub mod watchdog;
