//! End-to-end scenarios against a mock vendor implant and mock stream
//! writers, covering the concrete scenarios and invariants this engine is
//! built to satisfy.

use bic_bridge_engine::{
    ClosedLoopConfig, EngineConfig, EnrichedSample, OpenLoopConfig, Sample, StreamWriter,
    TelemetryMessage, VendorError,
};
use bic_bridge_engine::engine::Engine;
use bic_bridge_engine::sample::MAX_CHANNELS;
use bic_bridge_engine::vendor::VendorImplant;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

struct MockImplant {
    stimulating: AtomicBool,
    fire_count: AtomicU32,
}

impl MockImplant {
    fn new() -> Arc<Self> {
        Arc::new(MockImplant {
            stimulating: AtomicBool::new(false),
            fire_count: AtomicU32::new(0),
        })
    }

    fn fire_count(&self) -> u32 {
        self.fire_count.load(Ordering::SeqCst)
    }
}

impl VendorImplant for MockImplant {
    fn start_measurement(&self, _reference_channel_set: &[usize]) -> Result<(), VendorError> {
        Ok(())
    }
    fn stop_measurement(&self) -> Result<(), VendorError> {
        Ok(())
    }
    fn start_stimulation(&self) -> Result<(), VendorError> {
        self.stimulating.store(true, Ordering::SeqCst);
        self.fire_count.fetch_add(1, Ordering::SeqCst);
        self.stimulating.store(false, Ordering::SeqCst);
        Ok(())
    }
    fn stop_stimulation(&self) -> Result<(), VendorError> {
        self.stimulating.store(false, Ordering::SeqCst);
        Ok(())
    }
    fn get_impedance(&self, _channel: usize) -> Result<f64, VendorError> {
        Ok(1000.0)
    }
    fn get_temperature(&self) -> Result<f64, VendorError> {
        Ok(36.5)
    }
    fn get_humidity(&self) -> Result<f64, VendorError> {
        Ok(40.0)
    }
    fn set_implant_power(&self, _on: bool) -> Result<(), VendorError> {
        Ok(())
    }
    fn is_stimulating(&self) -> bool {
        self.stimulating.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct RecordingWriter<T> {
    received: Arc<Mutex<Vec<T>>>,
}

impl<T: Send> StreamWriter<T> for RecordingWriter<T> {
    fn write(&self, msg: T) -> Result<(), bic_bridge_engine::vendor::WriterError> {
        self.received.lock().unwrap().push(msg);
        Ok(())
    }
}

fn sample_with_value(counter: u32, value: f64, stimulation_active: bool) -> Sample {
    let mut values = [0.0; MAX_CHANNELS];
    values[0] = value;
    Sample {
        counter,
        values,
        channel_count: 1,
        supply_voltage: 3.3,
        connected: true,
        stimulation_id: 0,
        stimulation_active,
        input_trigger_high: false,
        reception_timestamp_ns: 0,
    }
}

#[test]
fn s2_gap_within_ceiling_emits_interpolated_samples() {
    let engine = Engine::new(EngineConfig::default());
    let implant = MockImplant::new();
    engine.attach_device(&(implant.clone() as Arc<dyn VendorImplant>)).unwrap();

    let received: Arc<Mutex<Vec<EnrichedSample>>> = Arc::new(Mutex::new(Vec::new()));
    let writer = RecordingWriter { received: received.clone() };
    engine.enable_neural_stream(true, writer).unwrap();

    engine.on_data(vec![sample_with_value(10, 0.0, false)]);
    engine.on_data(vec![sample_with_value(13, 30.0, false)]);

    std::thread::sleep(std::time::Duration::from_millis(50));
    engine
        .enable_neural_stream(false, RecordingWriter::<Vec<EnrichedSample>>::default())
        .unwrap();

    let got = received.lock().unwrap();
    let counters: Vec<u32> = got.iter().flatten().map(|s| s.sample.counter).collect();
    assert!(counters.contains(&11));
    assert!(counters.contains(&12));
    assert!(counters.contains(&13));
}

#[test]
fn s5_enabling_open_loop_while_closed_loop_active_is_rejected() {
    let engine = Engine::new(EngineConfig::default());
    let implant = MockImplant::new();
    engine.attach_device(&(implant.clone() as Arc<dyn VendorImplant>)).unwrap();

    engine.enable_closed_loop(true, ClosedLoopConfig::default()).unwrap();
    let result = engine.enable_open_loop(true, OpenLoopConfig::default());
    assert!(result.is_err());

    engine.enable_closed_loop(false, ClosedLoopConfig::default()).unwrap();
}

#[test]
fn double_enable_and_disable_are_idempotent() {
    let engine = Engine::new(EngineConfig::default());
    let implant = MockImplant::new();
    engine.attach_device(&(implant.clone() as Arc<dyn VendorImplant>)).unwrap();

    let received: Arc<Mutex<Vec<TelemetryMessage>>> = Arc::new(Mutex::new(Vec::new()));
    engine
        .enable_temperature_stream(true, Some(RecordingWriter { received: received.clone() }))
        .unwrap();
    engine
        .enable_temperature_stream::<RecordingWriter<TelemetryMessage>>(true, None)
        .unwrap();
    engine
        .enable_temperature_stream::<RecordingWriter<TelemetryMessage>>(false, None)
        .unwrap();
    engine
        .enable_temperature_stream::<RecordingWriter<TelemetryMessage>>(false, None)
        .unwrap();
}

#[test]
fn telemetry_callback_reaches_subscribed_stream() {
    let engine = Engine::new(EngineConfig::default());
    let received: Arc<Mutex<Vec<TelemetryMessage>>> = Arc::new(Mutex::new(Vec::new()));
    engine
        .enable_temperature_stream(true, Some(RecordingWriter { received: received.clone() }))
        .unwrap();

    engine.on_temperature_changed(37.2);
    std::thread::sleep(std::time::Duration::from_millis(50));

    let got = received.lock().unwrap();
    assert_eq!(got.len(), 1);
    assert!(matches!(got[0], TelemetryMessage::Temperature { celsius } if (celsius - 37.2).abs() < 1e-9));
}

#[test]
fn s1_closed_loop_fires_stimulation_on_sinusoid() {
    let engine = Engine::new(EngineConfig::default());
    let implant = MockImplant::new();
    engine.attach_device(&(implant.clone() as Arc<dyn VendorImplant>)).unwrap();

    let mut cfg = ClosedLoopConfig::default();
    cfg.amplitude_threshold = 0.0;
    engine.enable_closed_loop(true, cfg).unwrap();

    let sample_period_secs = 0.001;
    let freq_hz = 20.0_f64;
    for n in 0..2000u32 {
        let t = n as f64 * sample_period_secs;
        let value = 100.0 * (2.0 * std::f64::consts::PI * freq_hz * t).sin();
        engine.on_data(vec![sample_with_value(n, value, implant.is_stimulating())]);
    }
    std::thread::sleep(std::time::Duration::from_millis(100));
    engine.enable_closed_loop(false, ClosedLoopConfig::default()).unwrap();

    assert!(implant.fire_count() > 0);
}
