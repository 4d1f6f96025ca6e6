//! Debounced push-button input
//!
//! Buttons are wired active-low with pull-ups. A press is registered on the
//! first low sample; the pin is then ignored for [`DEBOUNCE`] to ride out
//! contact bounce, and the event is delivered once the button is released.

use embassy_time::Duration;
use embedded_hal::digital::InputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error};

/// Time after a press during which the pin level is ignored
pub const DEBOUNCE: Duration = Duration::from_millis(150);

/// Interval between two pin scans
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Menu,
    Cancel,
    Up,
    Down,
    Ok,
}

impl Button {
    /// All buttons, in the pin order expected by [`DebouncedButtons`].
    pub const ALL: [Button; 5] = [
        Button::Menu,
        Button::Cancel,
        Button::Up,
        Button::Down,
        Button::Ok,
    ];
}

/// A source of debounced, edge-triggered button presses
pub trait ButtonEvents {
    /// Wait for the next completed press.
    fn next_press(&mut self) -> impl Future<Output = Button>;

    /// Forget any press still in progress.
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Released,
    Settling { remaining: Duration },
    AwaitingRelease,
}

/// Press/release tracker for one button
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    state: DebounceState,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            state: DebounceState::Released,
        }
    }

    /// Feed one pin sample taken `elapsed` after the previous one.
    ///
    /// Returns `true` exactly once per press, when the button is released
    /// after the debounce window.
    pub fn update(&mut self, pressed: bool, elapsed: Duration) -> bool {
        match self.state {
            DebounceState::Released => {
                if pressed {
                    self.state = DebounceState::Settling {
                        remaining: DEBOUNCE,
                    };
                }
                false
            }
            DebounceState::Settling { remaining } => {
                if elapsed >= remaining {
                    self.state = DebounceState::AwaitingRelease;
                    // The level at the end of the window counts
                    return self.update(pressed, Duration::from_ticks(0));
                }
                self.state = DebounceState::Settling {
                    remaining: remaining - elapsed,
                };
                false
            }
            DebounceState::AwaitingRelease => {
                if pressed {
                    false
                } else {
                    self.state = DebounceState::Released;
                    true
                }
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == DebounceState::Released
    }

    pub fn reset(&mut self) {
        self.state = DebounceState::Released;
    }
}

/// Scans active-low button pins and yields debounced presses
///
/// Pins are given in [`Button::ALL`] order.
pub struct DebouncedButtons<P, D> {
    pins: [P; 5],
    debouncers: [Debouncer; 5],
    delay: D,
}

impl<P: InputPin, D: DelayNs> DebouncedButtons<P, D> {
    pub fn new(pins: [P; 5], delay: D) -> Self {
        Self {
            pins,
            debouncers: [Debouncer::new(); 5],
            delay,
        }
    }

    /// Scan all pins once. Returns the first button whose press completed.
    pub fn scan(&mut self, elapsed: Duration) -> Option<Button> {
        let mut completed = None;
        for (i, pin) in self.pins.iter_mut().enumerate() {
            let pressed = pin.is_low().unwrap_or_else(|e| {
                error!("Button pin read failed: {:?}", e);
                false
            });
            if self.debouncers[i].update(pressed, elapsed) && completed.is_none() {
                completed = Some(Button::ALL[i]);
            }
        }
        completed
    }
}

impl<P: InputPin, D: DelayNs> ButtonEvents for DebouncedButtons<P, D> {
    async fn next_press(&mut self) -> Button {
        let mut elapsed = Duration::from_ticks(0);
        loop {
            if let Some(button) = self.scan(elapsed) {
                debug!("Button {:?} pressed", button);
                return button;
            }
            self.delay.delay_ms(POLL_INTERVAL.as_millis() as u32).await;
            elapsed = POLL_INTERVAL;
        }
    }

    fn reset(&mut self) {
        for debouncer in self.debouncers.iter_mut() {
            debouncer.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::convert::Infallible;

    use super::*;

    const TICK: Duration = Duration::from_millis(10);

    #[test]
    fn test_event_fires_on_release_after_debounce() {
        let mut debouncer = Debouncer::new();

        assert!(!debouncer.update(true, TICK), "Press edge must not fire");
        for _ in 0..20 {
            assert!(!debouncer.update(true, TICK), "Holding must not fire");
        }
        assert!(debouncer.update(false, TICK), "Release must fire");
        assert!(debouncer.is_idle());
        assert!(!debouncer.update(false, TICK), "Idle must not fire again");
    }

    #[test]
    fn test_bounce_inside_window_is_ignored() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.update(true, TICK));

        // Contact bounce during the first 140 ms
        for i in 0..14 {
            assert!(!debouncer.update(i % 2 == 0, TICK));
        }
        // Window ends at 150 ms with the button already released
        assert!(debouncer.update(false, TICK));
    }

    #[test]
    fn test_short_tap_still_registers() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.update(true, TICK));
        assert!(!debouncer.update(false, Duration::from_millis(100)));
        assert!(debouncer.update(false, Duration::from_millis(50)));
    }

    /// Active-low pin that reads low for the scans listed in `low`.
    struct ScriptedPin<'a> {
        scan: &'a Cell<usize>,
        low: &'static [usize],
    }

    impl embedded_hal::digital::ErrorType for ScriptedPin<'_> {
        type Error = Infallible;
    }

    impl InputPin for ScriptedPin<'_> {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.low.contains(&self.scan.get()))
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(self.low.contains(&self.scan.get()))
        }
    }

    /// Delay that advances the shared scan counter instead of sleeping.
    struct StepDelay<'a> {
        scan: &'a Cell<usize>,
    }

    impl DelayNs for StepDelay<'_> {
        async fn delay_ns(&mut self, _ns: u32) {
            self.scan.set(self.scan.get() + 1);
        }
    }

    #[test]
    fn test_debounced_buttons_yield_presses_in_order() {
        let scan = Cell::new(0);
        // Ok held for scans 2..=5, Cancel for scans 40..=41
        const OK_LOW: &[usize] = &[2, 3, 4, 5];
        const CANCEL_LOW: &[usize] = &[40, 41];
        const NEVER: &[usize] = &[];

        let pin = |low| ScriptedPin { scan: &scan, low };
        let mut buttons = DebouncedButtons::new(
            [pin(NEVER), pin(CANCEL_LOW), pin(NEVER), pin(NEVER), pin(OK_LOW)],
            StepDelay { scan: &scan },
        );

        assert_eq!(embassy_futures::block_on(buttons.next_press()), Button::Ok);
        // Press at scan 2 plus 150 ms of debounce
        assert_eq!(scan.get(), 17);

        assert_eq!(
            embassy_futures::block_on(buttons.next_press()),
            Button::Cancel
        );
        assert_eq!(scan.get(), 55);
    }

    #[test]
    fn test_reset_discards_unfinished_press() {
        let scan = Cell::new(0);
        const OK_LOW: &[usize] = &[0, 1];
        const NEVER: &[usize] = &[];

        let pin = |low| ScriptedPin { scan: &scan, low };
        let mut buttons = DebouncedButtons::new(
            [pin(NEVER), pin(NEVER), pin(NEVER), pin(NEVER), pin(OK_LOW)],
            StepDelay { scan: &scan },
        );

        assert_eq!(buttons.scan(TICK), None, "Press edge");
        scan.set(1);
        assert_eq!(buttons.scan(DEBOUNCE), None, "Window over, still held");

        buttons.reset();
        scan.set(2);
        assert_eq!(
            buttons.scan(TICK),
            None,
            "Release after a reset must not complete the old press"
        );
    }
}
