//! Health assessment for climate readings
//!
//! The medicine box raises a local warning (LED and buzzer) whenever the
//! measured climate falls outside the range considered safe for storage.

use crate::sensors::ClimateReading;

pub const TEMP_LOW_C: f32 = -20.0;
pub const TEMP_HIGH_C: f32 = 100.0;
pub const HUMIDITY_LOW_PERCENT: f32 = 0.0;
pub const HUMIDITY_HIGH_PERCENT: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateStatus {
    /// Temperature and humidity within the safe range
    Healthy,
    /// At least one reading outside the safe range
    OutOfRange,
    /// Not enough data to judge (humidity unavailable)
    Unknown,
}

impl ClimateStatus {
    /// Assess a climate reading against the fixed thresholds.
    pub fn assess(reading: &ClimateReading) -> Self {
        let ClimateReading {
            temperature_c,
            humidity_percent,
        } = *reading;

        if temperature_c.is_nan() || humidity_percent.is_nan() {
            return Self::Unknown;
        }

        if (TEMP_LOW_C..=TEMP_HIGH_C).contains(&temperature_c)
            && (HUMIDITY_LOW_PERCENT..=HUMIDITY_HIGH_PERCENT).contains(&humidity_percent)
        {
            Self::Healthy
        } else {
            Self::OutOfRange
        }
    }

    /// Whether the warning output should be on, or `None` to leave it as is.
    pub const fn warning(self) -> Option<bool> {
        match self {
            Self::Healthy => Some(false),
            Self::OutOfRange => Some(true),
            Self::Unknown => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::OutOfRange => "Out of range",
            Self::Unknown => "Unknown",
        }
    }
}
