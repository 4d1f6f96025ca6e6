use log::debug;

use super::{LightReading, Sensor, SensorError};

/// ADC count treated as full brightness. Readings above it clamp to 1.0.
pub const LDR_FULL_SCALE: f32 = 4000.0;

/// A raw analog channel, e.g. one ADC pin.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

/// Convert a raw ADC count into a `[0, 1]` light intensity.
pub fn normalize_ldr(raw: u16) -> f32 {
    (raw as f32 / LDR_FULL_SCALE).clamp(0.0, 1.0)
}

/// Light-dependent resistor on an analog input
pub struct LdrSensor<A> {
    input: A,
}

impl<A: AnalogInput> LdrSensor<A> {
    pub fn new(input: A) -> Self {
        Self { input }
    }
}

impl<A: AnalogInput> Sensor for LdrSensor<A> {
    type Readings = LightReading;

    async fn read(&mut self) -> Result<LightReading, SensorError> {
        let raw = self.input.read_raw()?;
        let intensity = normalize_ldr(raw);
        debug!("LDR - raw: {} norm: {}", raw, intensity);

        Ok(LightReading { intensity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAdc(Result<u16, SensorError>);

    impl AnalogInput for FixedAdc {
        fn read_raw(&mut self) -> Result<u16, SensorError> {
            self.0
        }
    }

    #[test]
    fn test_normalize_ldr() {
        assert_eq!(normalize_ldr(0), 0.0);
        assert_eq!(normalize_ldr(2000), 0.5);
        assert_eq!(normalize_ldr(4000), 1.0);
        assert_eq!(normalize_ldr(4095), 1.0, "Counts above full scale clamp");
    }

    #[test]
    fn test_ldr_sensor_reads_normalized() {
        let mut ldr = LdrSensor::new(FixedAdc(Ok(1000)));
        let reading = embassy_futures::block_on(ldr.read()).unwrap();
        assert_eq!(reading.intensity, 0.25);
    }

    #[test]
    fn test_ldr_sensor_propagates_errors() {
        let error = SensorError::ReadFailed {
            sensor: "LDR",
            operation: "adc read",
        };
        let mut ldr = LdrSensor::new(FixedAdc(Err(error)));
        assert_eq!(embassy_futures::block_on(ldr.read()), Err(error));
    }
}
