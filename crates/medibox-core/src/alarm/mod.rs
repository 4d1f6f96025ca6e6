//! Time-of-day medicine alarms
//!
//! The [`AlarmScheduler`] owns the alarm list and the snooze state and is
//! ticked with the wall-clock time. A due alarm is handed to a [`Ringer`],
//! which blocks until the user either cancels or acknowledges it.

mod ringer;
mod scheduler;

use core::fmt;

use thiserror_no_std::Error;

pub use ringer::*;
pub use scheduler::*;

/// Maximum number of alarms held by the scheduler
pub const MAX_ALARMS: usize = 8;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmError {
    #[error("invalid alarm time {hour}:{minute}")]
    InvalidTime { hour: u8, minute: u8 },
    #[error("alarm list is full")]
    Full,
    #[error("no alarm at index {0}")]
    NoSuchAlarm(usize),
}

/// One daily alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alarm {
    pub hour: u8,
    pub minute: u8,
    pub enabled: bool,
    /// Set once the alarm has rung. Nothing clears it except
    /// [`AlarmScheduler::enable`] or a restart.
    pub triggered: bool,
}

impl Alarm {
    /// A new enabled, untriggered alarm.
    pub fn new(hour: u8, minute: u8) -> Result<Self, AlarmError> {
        if hour >= 24 || minute >= 60 {
            return Err(AlarmError::InvalidTime { hour, minute });
        }
        Ok(Self {
            hour,
            minute,
            enabled: true,
            triggered: false,
        })
    }

    /// Whether this alarm should ring at `hour:minute`.
    pub fn is_due(&self, hour: u8, minute: u8) -> bool {
        self.enabled && !self.triggered && self.hour == hour && self.minute == minute
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02} {}",
            self.hour,
            self.minute,
            if self.enabled { "ON" } else { "OFF" }
        )
    }
}

/// How a ringing alarm was ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOutcome {
    /// Cancelled: back to normal polling
    Stopped,
    /// Acknowledged: alarm checks pause for the snooze window
    Snoozed,
}

/// Sounds an alarm until the user reacts
pub trait Ringer {
    fn ring(&mut self, alarm: &Alarm) -> impl Future<Output = RingOutcome>;
}
