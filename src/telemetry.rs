//! Low-rate telemetry messages multiplexed to subscribed clients alongside
//! the neural stream.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerParameter {
    Voltage,
    CoilCurrent,
    Control,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    Temperature { celsius: f64 },
    Humidity { percent: f64 },
    Connection { kind: String, connected: bool },
    Power {
        parameter: PowerParameter,
        value: f64,
        units: String,
    },
    Error { message: String },
}
