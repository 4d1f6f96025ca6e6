//! Cooperative polling loop
//!
//! [`MediBox`] owns all device state. The platform calls [`MediBox::start`]
//! once and then [`MediBox::poll`] in a tight loop; each poll runs whichever
//! of the config, alarm, sample and send steps are due.

use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;
use log::{debug, error, info, warn};

use crate::actuators::{ShadeActuator, WarningIndicator};
use crate::alarm::{AlarmScheduler, Ringer};
use crate::clock::Clock;
use crate::config::{ConfigInbox, ConfigStore, ControlConfig};
use crate::control::compute_angle;
use crate::metrics::ClimateStatus;
use crate::sampling::{IntervalTimer, SampleBuffer};
use crate::sensors::{ClimateReading, LightReading, Sensor};
use crate::telemetry::{DEBUG_MESSAGE_LEN, PublishReport, TelemetrySink, Topic, publish_cycle};

/// How often alarms are compared against the wall clock
pub const ALARM_CHECK_PERIOD: Duration = Duration::from_secs(1);

/// Collaborators driven by the loop
pub struct Devices<L, C, S, T, R, W> {
    pub light: L,
    pub climate: C,
    pub shade: S,
    pub telemetry: T,
    pub ringer: R,
    pub warning: W,
}

/// Result of one completed send cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendCycle {
    pub intensity: f32,
    pub temperature_c: f32,
    pub angle: f32,
    pub published: PublishReport,
}

pub struct MediBox<'a, K> {
    clock: K,
    inbox: &'a ConfigInbox,
    config: ConfigStore,
    samples: SampleBuffer,
    sample_timer: IntervalTimer,
    send_timer: IntervalTimer,
    alarm_timer: IntervalTimer,
    alarms: AlarmScheduler,
    climate_status: ClimateStatus,
}

impl<'a, K: Clock> MediBox<'a, K> {
    /// Create the loop state with the boot-time alarms. All timers start
    /// counting from the current instant.
    pub fn new(clock: K, inbox: &'a ConfigInbox, config: ControlConfig) -> Self {
        let now = clock.now();
        Self {
            clock,
            inbox,
            config: ConfigStore::new(config),
            samples: SampleBuffer::new(),
            sample_timer: IntervalTimer::new(now),
            send_timer: IntervalTimer::new(now),
            alarm_timer: IntervalTimer::new(now),
            alarms: AlarmScheduler::with_startup_alarms(),
            climate_status: ClimateStatus::Unknown,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        self.config.current()
    }

    pub fn alarms(&self) -> &AlarmScheduler {
        &self.alarms
    }

    pub fn alarms_mut(&mut self) -> &mut AlarmScheduler {
        &mut self.alarms
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn climate_status(&self) -> ClimateStatus {
        self.climate_status
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Move the shade to its baseline and announce the boot.
    pub async fn start<L, C, S, T, R, W>(&mut self, devices: &mut Devices<L, C, S, T, R, W>)
    where
        S: ShadeActuator,
        T: TelemetrySink,
    {
        let baseline = self.config().angle_offset_deg;
        if let Err(e) = devices.shade.set_angle(baseline) {
            error!("Failed to move shade to baseline: {}", e);
        }
        info!("MediBox started, shade at {}°", baseline);

        if !devices
            .telemetry
            .publish(Topic::Debug, "MediBox started")
            .await
        {
            warn!("Startup message not published");
        }
    }

    /// Run one iteration of the loop.
    ///
    /// Returns the send cycle if one completed during this call.
    pub async fn poll<L, C, S, T, R, W>(
        &mut self,
        devices: &mut Devices<L, C, S, T, R, W>,
    ) -> Option<SendCycle>
    where
        L: Sensor<Readings = LightReading>,
        C: Sensor<Readings = ClimateReading>,
        S: ShadeActuator,
        T: TelemetrySink,
        R: Ringer,
        W: WarningIndicator,
    {
        if self.config.drain_inbox(self.inbox) > 0 {
            let config = *self.config.current();
            let mut line: String<DEBUG_MESSAGE_LEN> = String::new();
            let _ = write!(
                line,
                "New config: sample {}s, send {}s, offset {}, gain {}, T_ref {}",
                config.sample_period_ms / 1000,
                config.send_period_ms / 1000,
                config.angle_offset_deg,
                config.gain,
                config.reference_temp_c
            );
            devices.telemetry.publish(Topic::Debug, &line).await;
        }

        if self.alarm_timer.poll(self.clock.now(), ALARM_CHECK_PERIOD) {
            match self.clock.time_of_day() {
                Some(time) => {
                    self.alarms
                        .tick(time, &self.clock, &mut devices.ringer)
                        .await;
                }
                None => debug!("Clock not synced, skipping alarm check"),
            }
        }

        // Ringing may have blocked for a while; use a fresh instant
        let now = self.clock.now();
        let config = *self.config.current();

        if self.sample_timer.poll(now, config.sample_period()) {
            match devices.light.read().await {
                Ok(reading) => {
                    if !self.samples.push(reading.intensity) {
                        debug!("Sample buffer full, dropping {}", reading.intensity);
                    }
                }
                Err(e) => error!("Light sample failed: {}", e),
            }
        }

        if self.samples.is_empty() || !self.send_timer.is_due(now, config.send_period()) {
            return None;
        }
        self.send_timer.fire(now);

        let intensity = self.samples.drain_average()?;
        let temperature_c = self.read_climate(devices).await;
        let angle = compute_angle(intensity, temperature_c, &config);

        if let Err(e) = devices.shade.set_angle(angle) {
            error!("Failed to move shade to {}°: {}", angle, e);
        }

        let published = publish_cycle(&mut devices.telemetry, intensity, temperature_c, angle).await;

        Some(SendCycle {
            intensity,
            temperature_c,
            angle,
            published,
        })
    }

    /// Read the climate sensor and update the warning output. Returns the
    /// temperature, NaN when the read failed.
    async fn read_climate<L, C, S, T, R, W>(
        &mut self,
        devices: &mut Devices<L, C, S, T, R, W>,
    ) -> f32
    where
        C: Sensor<Readings = ClimateReading>,
        T: TelemetrySink,
        W: WarningIndicator,
    {
        let reading = match devices.climate.read().await {
            Ok(reading) => reading,
            Err(e) => {
                error!("Climate read failed: {}", e);
                let mut line: String<DEBUG_MESSAGE_LEN> = String::new();
                // Truncated when the error text is long
                let _ = write!(line, "Climate read failed: {}", e);
                devices.telemetry.publish(Topic::Debug, &line).await;
                ClimateReading {
                    temperature_c: f32::NAN,
                    humidity_percent: f32::NAN,
                }
            }
        };

        let status = ClimateStatus::assess(&reading);
        if let Some(active) = status.warning() {
            if status != self.climate_status {
                info!("Climate {}", status.label());
            }
            devices.warning.set_warning(active);
        }
        self.climate_status = status;

        reading.temperature_c
    }
}
