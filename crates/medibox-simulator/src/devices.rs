//! Simulated peripherals.
//!
//! Sensors produce slow sine waves, actuators log what the hardware would
//! do, and buttons are virtual pins pressed from the console.

use std::convert::Infallible;
use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info};

use medibox_core::actuators::{
    ActuatorError, Buzzer, LedWarning, Servo, ShadeActuator, WarningIndicator,
};
use medibox_core::clock::{Clock, TimeOfDay};
use medibox_core::input::Button;
use medibox_core::sensors::{
    AnalogInput, ClimateReading, LDR_FULL_SCALE, Sensor, SensorError,
};

use crate::settings::Simulation;

/// How long a console button press holds the virtual pin low
pub const PRESS_DURATION: Duration = Duration::from_millis(200);

/// Resolution of the simulated servo PWM channel (14-bit)
const SERVO_MAX_DUTY: u16 = (1 << 14) - 1;

/// Warning buzzer frequency
const WARNING_TONE_HZ: u32 = 1000;

fn wave(start: Instant, mean: f32, swing: f32, period_secs: f32) -> f32 {
    if period_secs <= 0.0 {
        return mean;
    }
    let t = start.elapsed().as_secs_f32();
    mean + swing * (TAU * t / period_secs).sin()
}

/// LDR divider read through a 12-bit ADC
pub struct SimulatedAdc {
    start: Instant,
    level: f32,
    swing: f32,
    period_secs: f32,
}

impl SimulatedAdc {
    pub fn new(simulation: &Simulation) -> Self {
        Self {
            start: Instant::now(),
            level: simulation.light_level,
            swing: simulation.light_swing,
            period_secs: simulation.light_period_secs,
        }
    }
}

impl AnalogInput for SimulatedAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        let level = wave(self.start, self.level, self.swing, self.period_secs).clamp(0.0, 1.0);
        Ok((level * LDR_FULL_SCALE) as u16)
    }
}

/// DHT22 stand-in
pub struct SimulatedDht {
    start: Instant,
    temperature_c: f32,
    swing: f32,
    period_secs: f32,
    humidity_percent: f32,
}

impl SimulatedDht {
    pub fn new(simulation: &Simulation) -> Self {
        Self {
            start: Instant::now(),
            temperature_c: simulation.temperature_c,
            swing: simulation.temperature_swing,
            period_secs: simulation.temperature_period_secs,
            humidity_percent: simulation.humidity_percent,
        }
    }
}

impl Sensor for SimulatedDht {
    type Readings = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        Ok(ClimateReading {
            temperature_c: wave(self.start, self.temperature_c, self.swing, self.period_secs),
            humidity_percent: self.humidity_percent,
        })
    }
}

/// PWM channel that logs duty updates
pub struct LoggingPwm;

impl embedded_hal::pwm::ErrorType for LoggingPwm {
    type Error = Infallible;
}

impl SetDutyCycle for LoggingPwm {
    fn max_duty_cycle(&self) -> u16 {
        SERVO_MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        debug!("Servo PWM duty {}/{}", duty, SERVO_MAX_DUTY);
        Ok(())
    }
}

pub struct SimulatedShade {
    servo: Servo<LoggingPwm>,
}

impl SimulatedShade {
    pub fn new() -> Self {
        Self {
            servo: Servo::new(LoggingPwm),
        }
    }
}

impl ShadeActuator for SimulatedShade {
    fn set_angle(&mut self, degrees: f32) -> Result<(), ActuatorError> {
        info!("Shade -> {:.1}°", degrees);
        self.servo.set_angle(degrees)
    }
}

/// Buzzer that logs tone changes
pub struct LoggingBuzzer {
    name: &'static str,
    playing: Option<u32>,
}

impl LoggingBuzzer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            playing: None,
        }
    }
}

impl Buzzer for LoggingBuzzer {
    fn tone(&mut self, frequency_hz: u32) {
        if self.playing != Some(frequency_hz) {
            debug!("{} buzzer: {} Hz", self.name, frequency_hz);
            self.playing = Some(frequency_hz);
        }
    }

    fn silence(&mut self) {
        if self.playing.take().is_some() {
            debug!("{} buzzer: silent", self.name);
        }
    }
}

/// LED that logs level changes
pub struct LoggingLed {
    name: &'static str,
    on: bool,
}

impl LoggingLed {
    pub fn new(name: &'static str) -> Self {
        Self { name, on: false }
    }
}

impl ErrorType for LoggingLed {
    type Error = Infallible;
}

impl OutputPin for LoggingLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.on {
            info!("{} LED off", self.name);
        }
        self.on = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.on {
            info!("{} LED on", self.name);
        }
        self.on = true;
        Ok(())
    }
}

/// Climate warning: LED plus a 1 kHz tone
pub struct ClimateAlert {
    led: LedWarning<LoggingLed>,
    buzzer: LoggingBuzzer,
}

impl ClimateAlert {
    pub fn new() -> Self {
        Self {
            led: LedWarning::new(LoggingLed::new("Warning")),
            buzzer: LoggingBuzzer::new("Warning"),
        }
    }
}

impl WarningIndicator for ClimateAlert {
    fn set_warning(&mut self, active: bool) {
        self.led.set_warning(active);
        if active {
            self.buzzer.tone(WARNING_TONE_HZ);
        } else {
            self.buzzer.silence();
        }
    }
}

/// Active-low push button driven from the console
#[derive(Clone, Default)]
pub struct VirtualButton {
    pressed: Arc<AtomicBool>,
}

impl ErrorType for VirtualButton {
    type Error = Infallible;
}

impl InputPin for VirtualButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pressed.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pressed.load(Ordering::Relaxed))
    }
}

/// The five front-panel buttons, shared between the console and the ringer
#[derive(Clone, Default)]
pub struct ButtonPanel {
    buttons: [VirtualButton; 5],
}

impl ButtonPanel {
    /// Pins in [`Button::ALL`] order.
    pub fn pins(&self) -> [VirtualButton; 5] {
        self.buttons.clone()
    }

    /// Hold `button` down for [`PRESS_DURATION`], then release it.
    pub fn press(&self, button: Button) {
        let Some(index) = Button::ALL.iter().position(|b| *b == button) else {
            return;
        };
        let pressed = self.buttons[index].pressed.clone();
        pressed.store(true, Ordering::Relaxed);
        tokio::spawn(async move {
            tokio::time::sleep(PRESS_DURATION).await;
            pressed.store(false, Ordering::Relaxed);
        });
    }
}

/// `DelayNs` on top of the tokio timer
#[derive(Clone, Copy, Default)]
pub struct TokioDelay;

impl DelayNs for TokioDelay {
    async fn delay_ns(&mut self, ns: u32) {
        tokio::time::sleep(Duration::from_nanos(ns as u64)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        tokio::time::sleep(Duration::from_millis(ms as u64)).await;
    }
}

/// Host clock, always synced
pub struct SystemClock {
    utc_offset_secs: i32,
    shift_secs: i64,
}

impl SystemClock {
    pub fn new(utc_offset_secs: i32) -> Self {
        Self {
            utc_offset_secs,
            shift_secs: 0,
        }
    }

    fn unix_now() -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }

    /// Shift the wall clock so that it currently reads `hour:minute:00`.
    pub fn start_at(&mut self, hour: u8, minute: u8) {
        let local = TimeOfDay::from_unix(Self::unix_now(), self.utc_offset_secs);
        let target = hour as i64 * 3600 + minute as i64 * 60;
        self.shift_secs = target - local.seconds_since_midnight() as i64;
        info!("Wall clock shifted by {} s", self.shift_secs);
    }
}

impl Clock for SystemClock {
    fn now(&self) -> embassy_time::Instant {
        embassy_time::Instant::now()
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        Some(TimeOfDay::from_unix(
            Self::unix_now() + self.shift_secs,
            self.utc_offset_secs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_light_signal() {
        let simulation = Simulation {
            light_level: 0.25,
            light_swing: 0.0,
            ..Simulation::default()
        };
        let mut adc = SimulatedAdc::new(&simulation);
        assert_eq!(adc.read_raw().unwrap(), 1000);
    }

    #[test]
    fn test_light_signal_is_clamped() {
        let simulation = Simulation {
            light_level: 1.5,
            light_swing: 0.0,
            ..Simulation::default()
        };
        let mut adc = SimulatedAdc::new(&simulation);
        assert_eq!(adc.read_raw().unwrap(), 4000);
    }

    #[test]
    fn test_start_at_shifts_wall_clock() {
        let mut clock = SystemClock::new(0);
        clock.start_at(7, 29);
        let time = clock.time_of_day().unwrap();
        assert_eq!((time.hour, time.minute), (7, 29));
    }

    #[test]
    fn test_virtual_button_is_active_low() {
        let panel = ButtonPanel::default();
        let mut pins = panel.pins();
        assert!(pins[4].is_high().unwrap());
        panel.buttons[4].pressed.store(true, Ordering::Relaxed);
        assert!(pins[4].is_low().unwrap());
    }
}
