//! Light sample buffering and the free-running loop timers.

use embassy_time::{Duration, Instant};
use heapless::Vec;

/// Maximum number of light samples held between two send cycles
pub const MAX_SAMPLES: usize = 50;

/// Fixed-capacity store of normalized light readings
///
/// Samples pushed while the buffer is full are dropped. There is no
/// wraparound: the oldest readings of a cycle are the ones that survive.
#[derive(Debug, Default)]
pub struct SampleBuffer<const N: usize = MAX_SAMPLES> {
    samples: Vec<f32, N>,
}

impl<const N: usize> SampleBuffer<N> {
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append a reading. Returns `false` when the buffer was full and the
    /// reading was discarded.
    pub fn push(&mut self, value: f32) -> bool {
        self.samples.push(value).is_ok()
    }

    /// Mean of all buffered readings, emptying the buffer.
    ///
    /// Returns `None` when nothing is buffered.
    pub fn drain_average(&mut self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }

        let sum: f32 = self.samples.iter().sum();
        let avg = sum / self.samples.len() as f32;
        self.samples.clear();
        Some(avg)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

/// A timer that remembers when it last fired
///
/// Firing resets the reference point to the moment of firing rather than
/// the scheduled deadline, so late ticks push every following deadline back
/// and a stalled loop never fires a burst to catch up.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    last_fired: Instant,
}

impl IntervalTimer {
    /// Create a timer whose first period starts at `now`.
    pub const fn new(now: Instant) -> Self {
        Self { last_fired: now }
    }

    pub fn is_due(&self, now: Instant, period: Duration) -> bool {
        now.saturating_duration_since(self.last_fired) >= period
    }

    pub fn fire(&mut self, now: Instant) {
        self.last_fired = now;
    }

    /// Fire if due. Returns whether the timer fired.
    pub fn poll(&mut self, now: Instant, period: Duration) -> bool {
        if self.is_due(now, period) {
            self.fire(now);
            true
        } else {
            false
        }
    }

    pub fn last_fired(&self) -> Instant {
        self.last_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_is_dropped() {
        let mut buffer: SampleBuffer<4> = SampleBuffer::new();
        for i in 0..7 {
            buffer.push(i as f32 / 10.0);
        }

        assert_eq!(buffer.len(), 4, "Count must saturate at capacity");
        assert!(!buffer.push(0.9), "Push into a full buffer must report the drop");

        // The first four readings survive: 0.0, 0.1, 0.2, 0.3
        let avg = buffer.drain_average().unwrap();
        assert!((avg - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_drain_average_resets_count() {
        let mut buffer: SampleBuffer = SampleBuffer::new();
        buffer.push(0.2);
        buffer.push(0.4);
        buffer.push(0.6);

        let avg = buffer.drain_average().unwrap();
        assert!((avg - 0.4).abs() < 1e-6, "Expected 0.4, got {}", avg);
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_empty_buffer() {
        let mut buffer: SampleBuffer<8> = SampleBuffer::new();
        assert_eq!(buffer.drain_average(), None);
    }

    #[test]
    fn test_default_capacity() {
        let buffer: SampleBuffer = SampleBuffer::default();
        assert_eq!(buffer.capacity(), MAX_SAMPLES);
    }

    #[test]
    fn test_timer_fires_after_period() {
        let period = Duration::from_millis(1000);
        let mut timer = IntervalTimer::new(Instant::from_millis(0));

        assert!(!timer.poll(Instant::from_millis(999), period));
        assert!(timer.poll(Instant::from_millis(1000), period));
        assert_eq!(timer.last_fired(), Instant::from_millis(1000));
    }

    #[test]
    fn test_timer_drifts_without_catch_up() {
        let period = Duration::from_millis(1000);
        let mut timer = IntervalTimer::new(Instant::from_millis(0));

        // Loop stalled for 3.5 periods: fires once, reference moves to now
        assert!(timer.poll(Instant::from_millis(3500), period));
        assert!(!timer.poll(Instant::from_millis(3510), period));
        assert!(!timer.poll(Instant::from_millis(4499), period));
        assert!(timer.poll(Instant::from_millis(4500), period));
    }
}
