//! Output devices: shade servo, buzzer and warning indicator.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::error;
use thiserror_no_std::Error;

use crate::config::MAX_ANGLE_DEG;

/// Servo PWM frame length at 50 Hz
pub const SERVO_PERIOD_US: f32 = 20_000.0;
/// Pulse width at 0 degrees
pub const SERVO_MIN_PULSE_US: f32 = 544.0;
/// Pulse width at 180 degrees
pub const SERVO_MAX_PULSE_US: f32 = 2400.0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("failed to update PWM duty cycle")]
    Pwm,
}

/// Anything that can position the light-blocking shade
pub trait ShadeActuator {
    fn set_angle(&mut self, degrees: f32) -> Result<(), ActuatorError>;
}

/// Piezo buzzer capable of playing a square-wave tone
pub trait Buzzer {
    fn tone(&mut self, frequency_hz: u32);
    fn silence(&mut self);
}

/// Local climate warning output
pub trait WarningIndicator {
    fn set_warning(&mut self, active: bool);
}

/// Hobby servo driven by a 50 Hz PWM channel
pub struct Servo<P> {
    pwm: P,
}

impl<P: SetDutyCycle> Servo<P> {
    /// Wrap a PWM channel already configured for a 50 Hz frame.
    pub fn new(pwm: P) -> Self {
        Self { pwm }
    }

    /// Duty cycle (in units of `max_duty`) producing `degrees`.
    pub fn duty_for_angle(degrees: f32, max_duty: u16) -> u16 {
        let degrees = if degrees.is_nan() {
            0.0
        } else {
            degrees.clamp(0.0, MAX_ANGLE_DEG)
        };
        let pulse_us = SERVO_MIN_PULSE_US
            + (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) * degrees / MAX_ANGLE_DEG;
        (pulse_us * max_duty as f32 / SERVO_PERIOD_US) as u16
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> ShadeActuator for Servo<P> {
    fn set_angle(&mut self, degrees: f32) -> Result<(), ActuatorError> {
        let duty = Self::duty_for_angle(degrees, self.pwm.max_duty_cycle());
        self.pwm.set_duty_cycle(duty).map_err(|e| {
            error!("Servo duty update failed: {:?}", e);
            ActuatorError::Pwm
        })
    }
}

/// Warning shown on a single LED
pub struct LedWarning<P> {
    led: P,
}

impl<P: OutputPin> LedWarning<P> {
    pub fn new(led: P) -> Self {
        Self { led }
    }
}

impl<P: OutputPin> WarningIndicator for LedWarning<P> {
    fn set_warning(&mut self, active: bool) {
        let result = if active {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        if let Err(e) = result {
            error!("Warning LED update failed: {:?}", e);
        }
    }
}
