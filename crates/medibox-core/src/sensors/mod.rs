mod ldr;

use thiserror_no_std::Error;

pub use ldr::*;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} read failed during {operation}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor} returned no data")]
    NoData { sensor: &'static str },
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Readings;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}

/// Normalized ambient light level, 0.0 (dark) to 1.0 (saturated).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightReading {
    pub intensity: f32,
}

/// Readings from the combined temperature/humidity sensor (DHT22).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    /// NaN when the humidity half of the read failed.
    pub humidity_percent: f32,
}
