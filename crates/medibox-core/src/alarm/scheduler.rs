use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{info, warn};

use super::{Alarm, AlarmError, MAX_ALARMS, RingOutcome, Ringer};
use crate::clock::{Clock, TimeOfDay};

/// Length of the snooze window
pub const SNOOZE_DURATION: Duration = Duration::from_millis(300_000);

/// Number of alarms created at boot
pub const STARTUP_ALARMS: usize = 2;

const _: () = assert!(STARTUP_ALARMS <= MAX_ALARMS);

/// Boot-time alarm: enabled, untriggered, 00:00
const MIDNIGHT: Alarm = Alarm {
    hour: 0,
    minute: 0,
    enabled: true,
    triggered: false,
};

/// Ordered alarm list plus the global snooze state
///
/// Alarms keep insertion order; they are never sorted by time.
#[derive(Debug, Default)]
pub struct AlarmScheduler {
    alarms: Vec<Alarm, MAX_ALARMS>,
    snooze_until: Option<Instant>,
}

impl AlarmScheduler {
    pub const fn new() -> Self {
        Self {
            alarms: Vec::new(),
            snooze_until: None,
        }
    }

    /// Scheduler holding the boot-time alarms (two at 00:00, enabled).
    pub fn with_startup_alarms() -> Self {
        let mut scheduler = Self::new();
        for _ in 0..STARTUP_ALARMS {
            if scheduler.alarms.push(MIDNIGHT).is_err() {
                warn!("No room for startup alarm");
                break;
            }
        }
        scheduler
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    /// Append an enabled alarm. Returns its index.
    pub fn add(&mut self, hour: u8, minute: u8) -> Result<usize, AlarmError> {
        let alarm = Alarm::new(hour, minute)?;
        self.alarms.push(alarm).map_err(|_| AlarmError::Full)?;
        info!("Alarm set for {:02}:{:02}", hour, minute);
        Ok(self.alarms.len() - 1)
    }

    /// Remove the alarm at `index`; later alarms move down one place.
    pub fn delete(&mut self, index: usize) -> Result<Alarm, AlarmError> {
        if index >= self.alarms.len() {
            return Err(AlarmError::NoSuchAlarm(index));
        }
        let alarm = self.alarms.remove(index);
        info!("Alarm {} ({}) deleted", index, alarm);
        Ok(alarm)
    }

    /// Disable every alarm. Fired alarms stay fired.
    pub fn disable_all(&mut self) {
        for alarm in self.alarms.iter_mut() {
            alarm.enabled = false;
        }
        info!("All alarms disabled");
    }

    /// Re-enable the alarm at `index` and re-arm it so it can ring again.
    pub fn enable(&mut self, index: usize) -> Result<(), AlarmError> {
        let alarm = self
            .alarms
            .get_mut(index)
            .ok_or(AlarmError::NoSuchAlarm(index))?;
        alarm.enabled = true;
        alarm.triggered = false;
        info!("Alarm {} ({}) re-armed", index, alarm);
        Ok(())
    }

    pub fn is_snoozing(&self) -> bool {
        self.snooze_until.is_some()
    }

    pub fn snooze_until(&self) -> Option<Instant> {
        self.snooze_until
    }

    /// Start the snooze window at `now`.
    pub fn snooze(&mut self, now: Instant) {
        let until = now + SNOOZE_DURATION;
        self.snooze_until = Some(until);
        info!("Snoozed for {} s", SNOOZE_DURATION.as_secs());
    }

    /// Check all alarms against the wall-clock `time`.
    ///
    /// Every due alarm is rung in list order and then marked triggered. A
    /// snooze started by one alarm does not stop later alarms of the same
    /// tick from ringing; it only suppresses the following ticks.
    ///
    /// Returns the number of alarms that rang.
    pub async fn tick<C: Clock, R: Ringer>(
        &mut self,
        time: TimeOfDay,
        clock: &C,
        ringer: &mut R,
    ) -> usize {
        if let Some(until) = self.snooze_until {
            if clock.now() < until {
                return 0;
            }
            self.snooze_until = None;
            info!("Snooze over, resuming alarm checks");
        }

        let mut rang = 0;
        for index in 0..self.alarms.len() {
            let alarm = self.alarms[index];
            if !alarm.is_due(time.hour, time.minute) {
                continue;
            }

            info!("Medicine time! Alarm {:02}:{:02} ringing", alarm.hour, alarm.minute);
            let outcome = ringer.ring(&alarm).await;
            self.alarms[index].triggered = true;
            rang += 1;

            match outcome {
                RingOutcome::Stopped => info!("Alarm stopped"),
                RingOutcome::Snoozed => {
                    if self.is_snoozing() {
                        warn!("Snooze restarted by a second alarm");
                    }
                    self.snooze(clock.now());
                }
            }
        }
        rang
    }
}
