//! Engine Façade (C9): the public surface — attach the device, enable or
//! disable each telemetry stream, arm or disarm each stimulation mode.
//!
//! A single explicit `Mode` replaces three independently-settable booleans
//! so arming one mode structurally can't leave another half-armed.

use crate::config::{ClosedLoopConfig, EngineConfig, OpenLoopConfig};
use crate::dsp::DspChain;
use crate::error::EngineError;
use crate::ingest::IngestState;
use crate::metrics::{Event, Metrics, MetricsSnapshot};
use crate::sample::Sample;
use crate::stim::controller::StimController;
use crate::stim::executor::{StimExecutor, StimSignal};
use crate::stim::stim_log::{default_filename, StimLogHandle, StimLogWriter};
use crate::stim::watchdog::OpenLoopWatchdog;
use crate::stream_pool::{NeuralStreamHandle, StreamHandle};
use crate::telemetry::{PowerParameter, TelemetryMessage};
use crate::vendor::{StreamWriter, VendorImplant};
use log::{error, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

/// Mutually-exclusive stimulation modes. Replaces `closedLoopEnabled`,
/// `openLoopEnabled`, `externallyStimulating` booleans with one structural
/// invariant instead of three independent flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    ClosedLoop,
    OpenLoop,
    External,
}

pub(crate) fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

struct ClosedLoopRuntime {
    signal: Arc<StimSignal>,
    executor: StimExecutor,
}

struct OpenLoopRuntime {
    watchdog: OpenLoopWatchdog,
}

/// The engine. One instance binds to one implant; no multi-device fan-in.
pub struct Engine {
    config: EngineConfig,
    mode: Mutex<Mode>,
    implant: Mutex<Option<Weak<dyn VendorImplant>>>,
    ingest: Mutex<IngestState>,
    active_signal: Mutex<Option<Arc<StimSignal>>>,

    neural: Mutex<Option<NeuralStreamHandle>>,
    temperature: Mutex<Option<StreamHandle<TelemetryMessage>>>,
    humidity: Mutex<Option<StreamHandle<TelemetryMessage>>>,
    connection: Mutex<Option<StreamHandle<TelemetryMessage>>>,
    error_stream: Mutex<Option<StreamHandle<TelemetryMessage>>>,
    power: Mutex<Option<StreamHandle<TelemetryMessage>>>,

    closed_loop: Mutex<Option<ClosedLoopRuntime>>,
    open_loop: Mutex<Option<OpenLoopRuntime>>,
    stim_log: Mutex<Option<StimLogWriter>>,

    metrics: Arc<Metrics>,
    seq: AtomicU64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let dsp = DspChain::new(
            ClosedLoopConfig::default().iir_b,
            ClosedLoopConfig::default().iir_a,
            config.sample_period_secs,
        );
        let controller = StimController::new(
            ClosedLoopConfig::default().initial_trigger_phase,
            ClosedLoopConfig::default().target_phase,
        );
        let ingest = IngestState::new(config.interpolation_ceiling, dsp, controller);

        Engine {
            config,
            mode: Mutex::new(Mode::Idle),
            implant: Mutex::new(None),
            ingest: Mutex::new(ingest),
            active_signal: Mutex::new(None),
            neural: Mutex::new(None),
            temperature: Mutex::new(None),
            humidity: Mutex::new(None),
            connection: Mutex::new(None),
            error_stream: Mutex::new(None),
            power: Mutex::new(None),
            closed_loop: Mutex::new(None),
            open_loop: Mutex::new(None),
            stim_log: Mutex::new(None),
            metrics: Arc::new(Metrics::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stores a non-owning reference to the implant. The engine never
    /// extends its lifetime; the caller (session layer) owns it and must
    /// detach before dropping it.
    pub fn attach_device(&self, implant: &Arc<dyn VendorImplant>) -> Result<(), EngineError> {
        *self.implant.lock() = Some(Arc::downgrade(implant));
        Ok(())
    }

    pub fn detach_device(&self) {
        *self.implant.lock() = None;
    }

    fn upgrade_implant(&self) -> Result<Arc<dyn VendorImplant>, EngineError> {
        self.implant
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(EngineError::NoDeviceAttached)
    }

    fn stim_log_handle(&self) -> StimLogHandle {
        let mut guard = self.stim_log.lock();
        if guard.is_none() {
            let path = default_filename(now_ns());
            match StimLogWriter::start(&path, self.metrics.clone()) {
                Ok(writer) => *guard = Some(writer),
                Err(e) => error!("failed to start stim-time log writer at {path}: {e}"),
            }
        }
        guard
            .as_ref()
            .map(|w| w.handle())
            .unwrap_or_else(|| StimLogHandle::disconnected(self.metrics.clone()))
    }

    pub fn is_triggering_stimulation(&self) -> bool {
        matches!(*self.mode.lock(), Mode::ClosedLoop | Mode::OpenLoop)
    }

    // ---- telemetry streams (C8 enable/disable) ----

    pub fn enable_neural_stream<W>(&self, enable: bool, writer: W) -> Result<(), EngineError>
    where
        W: StreamWriter<Vec<crate::sample::EnrichedSample>> + 'static,
    {
        let mut guard = self.neural.lock();
        if !enable {
            if let Some(handle) = guard.take() {
                drop(guard);
                handle.disable();
            }
            return Ok(());
        }
        if guard.is_some() {
            return Ok(());
        }
        *guard = Some(NeuralStreamHandle::spawn(
            self.config.neural_queue_capacity,
            self.config.neural_batch_size,
            writer,
        ));
        Ok(())
    }

    fn enable_telemetry_stream<W>(
        slot: &Mutex<Option<StreamHandle<TelemetryMessage>>>,
        name: &'static str,
        capacity: usize,
        enable: bool,
        writer: Option<W>,
    ) -> Result<(), EngineError>
    where
        W: StreamWriter<TelemetryMessage> + 'static,
    {
        let mut guard = slot.lock();
        if !enable {
            if let Some(handle) = guard.take() {
                drop(guard);
                handle.disable();
            }
            return Ok(());
        }
        if guard.is_some() {
            return Ok(());
        }
        let writer = writer.expect("writer required when enabling a stream");
        *guard = Some(StreamHandle::spawn(name, capacity, writer));
        Ok(())
    }

    pub fn enable_temperature_stream<W: StreamWriter<TelemetryMessage> + 'static>(&self, enable: bool, writer: Option<W>) -> Result<(), EngineError> {
        Self::enable_telemetry_stream(&self.temperature, "temperature", self.config.telemetry_queue_capacity, enable, writer)
    }

    pub fn enable_humidity_stream<W: StreamWriter<TelemetryMessage> + 'static>(&self, enable: bool, writer: Option<W>) -> Result<(), EngineError> {
        Self::enable_telemetry_stream(&self.humidity, "humidity", self.config.telemetry_queue_capacity, enable, writer)
    }

    pub fn enable_connection_stream<W: StreamWriter<TelemetryMessage> + 'static>(&self, enable: bool, writer: Option<W>) -> Result<(), EngineError> {
        Self::enable_telemetry_stream(&self.connection, "connection", self.config.telemetry_queue_capacity, enable, writer)
    }

    pub fn enable_error_stream<W: StreamWriter<TelemetryMessage> + 'static>(&self, enable: bool, writer: Option<W>) -> Result<(), EngineError> {
        Self::enable_telemetry_stream(&self.error_stream, "error", self.config.telemetry_queue_capacity, enable, writer)
    }

    pub fn enable_power_stream<W: StreamWriter<TelemetryMessage> + 'static>(&self, enable: bool, writer: Option<W>) -> Result<(), EngineError> {
        Self::enable_telemetry_stream(&self.power, "power", self.config.telemetry_queue_capacity, enable, writer)
    }

    // ---- stimulation mode arming ----

    pub fn enable_closed_loop(&self, enable: bool, cfg: ClosedLoopConfig) -> Result<(), EngineError> {
        let mut mode = self.mode.lock();

        if !enable {
            if *mode != Mode::ClosedLoop {
                return Ok(());
            }
            *mode = Mode::Idle;
            drop(mode);
            let implant = self.upgrade_implant()?;
            *self.active_signal.lock() = None;
            if let Some(rt) = self.closed_loop.lock().take() {
                rt.executor.shutdown(implant.as_ref(), &rt.signal);
            }
            return Ok(());
        }

        match *mode {
            Mode::Idle => {}
            Mode::ClosedLoop => return Ok(()),
            other => {
                return Err(EngineError::ModeConflict {
                    requested: Mode::ClosedLoop,
                    active: other,
                })
            }
        }

        let implant = match self.upgrade_implant() {
            Ok(i) => i,
            Err(e) => return Err(e),
        };

        {
            let mut ingest = self.ingest.lock();
            let dsp = DspChain::new(cfg.iir_b, cfg.iir_a, self.config.sample_period_secs);
            let controller = StimController::new(cfg.initial_trigger_phase, cfg.target_phase);
            ingest.rearm(dsp, controller, cfg.sensing_channel, cfg.amplitude_threshold);
        }

        let log_handle = self.stim_log_handle();
        let signal = StimSignal::new();
        let executor = StimExecutor::spawn(implant, signal.clone(), log_handle, self.metrics.clone());
        *self.active_signal.lock() = Some(signal.clone());
        *self.closed_loop.lock() = Some(ClosedLoopRuntime { signal, executor });
        *mode = Mode::ClosedLoop;
        Ok(())
    }

    pub fn enable_open_loop(&self, enable: bool, cfg: OpenLoopConfig) -> Result<(), EngineError> {
        let mut mode = self.mode.lock();

        if !enable {
            if *mode != Mode::OpenLoop {
                return Ok(());
            }
            *mode = Mode::Idle;
            drop(mode);
            let implant = self.upgrade_implant()?;
            if let Some(rt) = self.open_loop.lock().take() {
                rt.watchdog.shutdown(implant.as_ref());
            }
            return Ok(());
        }

        match *mode {
            Mode::Idle => {}
            Mode::OpenLoop => return Ok(()),
            other => {
                return Err(EngineError::ModeConflict {
                    requested: Mode::OpenLoop,
                    active: other,
                })
            }
        }

        let implant = match self.upgrade_implant() {
            Ok(i) => i,
            Err(e) => return Err(e),
        };

        let log_handle = self.stim_log_handle();
        let watchdog = OpenLoopWatchdog::spawn(implant, log_handle, cfg.watchdog_interval_ms, self.metrics.clone());
        *self.open_loop.lock() = Some(OpenLoopRuntime { watchdog });
        *mode = Mode::OpenLoop;
        Ok(())
    }

    // ---- vendor callbacks ----

    /// Receives a batch of raw samples on the vendor's callback thread.
    /// Must not block: every enqueue below is non-blocking with
    /// drop-on-overflow.
    pub fn on_data(&self, batch: Vec<Sample>) {
        let received_at = now_ns();
        let closed_loop_enabled = *self.mode.lock() == Mode::ClosedLoop;
        let signal = self.active_signal.lock().clone();

        let mut ingest = self.ingest.lock();
        let neural = self.neural.lock();

        for mut raw in batch {
            raw.reception_timestamp_ns = received_at;

            for tick in ingest.process(raw, closed_loop_enabled, &self.metrics) {
                if tick.should_fire {
                    if let Some(sig) = &signal {
                        sig.notify(tick.enriched.trigger_phase);
                        self.metrics.record(Event::StimFired);
                    }
                }

                if let Some(n) = neural.as_ref() {
                    if matches!(n.push(tick.enriched), crate::queue::PushResult::Dropped) {
                        self.metrics.record(Event::NeuralQueueDropped);
                    }
                }
            }
        }
        self.seq.fetch_add(1, Ordering::Relaxed);
    }

    fn push_telemetry(&self, slot: &Mutex<Option<StreamHandle<TelemetryMessage>>>, msg: TelemetryMessage) {
        if let Some(handle) = slot.lock().as_ref() {
            if matches!(handle.push(msg), crate::queue::PushResult::Dropped) {
                self.metrics.record(Event::TelemetryQueueDropped);
            }
        }
    }

    pub fn on_temperature_changed(&self, celsius: f64) {
        self.push_telemetry(&self.temperature, TelemetryMessage::Temperature { celsius });
    }

    pub fn on_humidity_changed(&self, percent: f64) {
        self.push_telemetry(&self.humidity, TelemetryMessage::Humidity { percent });
    }

    pub fn on_implant_voltage_changed(&self, value: f64) {
        self.push_telemetry(
            &self.power,
            TelemetryMessage::Power { parameter: PowerParameter::Voltage, value, units: "V".into() },
        );
    }

    pub fn on_primary_coil_current_changed(&self, value: f64) {
        self.push_telemetry(
            &self.power,
            TelemetryMessage::Power { parameter: PowerParameter::CoilCurrent, value, units: "A".into() },
        );
    }

    pub fn on_implant_control_value_changed(&self, value: f64) {
        self.push_telemetry(
            &self.power,
            TelemetryMessage::Power { parameter: PowerParameter::Control, value, units: "".into() },
        );
    }

    pub fn on_connection_state_changed(&self, kind: String, connected: bool) {
        self.push_telemetry(&self.connection, TelemetryMessage::Connection { kind, connected });
    }

    pub fn on_error(&self, message: String) {
        warn!("vendor error: {message}");
        self.push_telemetry(&self.error_stream, TelemetryMessage::Error { message });
    }

    /// Critical: logged and fanned into the error stream.
    pub fn on_data_processing_too_slow(&self) {
        error!("vendor reports data processing too slow");
        self.push_telemetry(
            &self.error_stream,
            TelemetryMessage::Error { message: "data processing too slow".into() },
        );
    }

    /// Observes the implant's stim-finished latch so a subsequent fire is
    /// only meaningful once the previous one has actually stopped.
    pub fn on_stimulation_state_changed(&self, active: bool) {
        if !active {
            log::debug!("vendor reports stimulation finished");
        }
    }
}
