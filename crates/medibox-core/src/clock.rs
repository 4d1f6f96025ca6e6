//! Monotonic and wall-clock time sources.

use core::fmt;

use embassy_time::Instant;

/// Device default UTC offset (+05:30)
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

const SECS_PER_DAY: i64 = 86_400;

/// Wall-clock time of day as reported by the network-synced clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    /// Returns `None` if any component is out of range.
    pub const fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Some(Self {
                hour,
                minute,
                second,
            })
        } else {
            None
        }
    }

    pub const fn from_seconds_since_midnight(secs: u32) -> Self {
        let secs = secs % SECS_PER_DAY as u32;
        Self {
            hour: (secs / 3600) as u8,
            minute: ((secs / 60) % 60) as u8,
            second: (secs % 60) as u8,
        }
    }

    /// Local time of day for a Unix timestamp shifted by `utc_offset_secs`.
    pub const fn from_unix(unix_secs: i64, utc_offset_secs: i32) -> Self {
        let local = (unix_secs + utc_offset_secs as i64).rem_euclid(SECS_PER_DAY);
        Self::from_seconds_since_midnight(local as u32)
    }

    pub const fn seconds_since_midnight(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Time source for the polling loop
pub trait Clock {
    /// Monotonic time since boot.
    fn now(&self) -> Instant;

    /// Local wall-clock time, or `None` until the clock has been synced.
    fn time_of_day(&self) -> Option<TimeOfDay>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        (**self).time_of_day()
    }
}
