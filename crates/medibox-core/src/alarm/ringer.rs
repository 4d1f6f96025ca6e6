use core::convert::Infallible;

use embassy_futures::select::{Either, select};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error};

use super::{Alarm, RingOutcome, Ringer};
use crate::actuators::Buzzer;
use crate::input::{Button, ButtonEvents};

/// Tone sequence of one alarm cycle, in Hz
pub const ALARM_TONES: [u32; 7] = [100, 200, 300, 400, 300, 200, 100];
/// Length of each tone
pub const TONE_MS: u32 = 500;
/// Silence between two cycles
pub const CYCLE_GAP_MS: u32 = 500;

/// Rings on a buzzer and two LEDs until Cancel or OK is pressed
///
/// Cancel stops the alarm, OK snoozes it. Other buttons are ignored. The
/// press is honored as soon as it completes, even mid-tone.
pub struct ButtonRinger<B, L, E, D> {
    buzzer: B,
    leds: [L; 2],
    buttons: E,
    delay: D,
}

impl<B, L, E, D> ButtonRinger<B, L, E, D>
where
    B: Buzzer,
    L: OutputPin,
    E: ButtonEvents,
    D: DelayNs,
{
    pub fn new(buzzer: B, leds: [L; 2], buttons: E, delay: D) -> Self {
        Self {
            buzzer,
            leds,
            buttons,
            delay,
        }
    }

    fn set_leds(&mut self, on: bool) {
        for led in self.leds.iter_mut() {
            let result = if on { led.set_high() } else { led.set_low() };
            if let Err(e) = result {
                error!("Alarm LED update failed: {:?}", e);
            }
        }
    }
}

async fn wait_for_decision<E: ButtonEvents>(buttons: &mut E) -> RingOutcome {
    loop {
        match buttons.next_press().await {
            Button::Cancel => return RingOutcome::Stopped,
            Button::Ok => return RingOutcome::Snoozed,
            other => debug!("Ignoring {:?} while ringing", other),
        }
    }
}

async fn play_tones<B: Buzzer, D: DelayNs>(buzzer: &mut B, delay: &mut D) -> Infallible {
    loop {
        for frequency in ALARM_TONES {
            buzzer.tone(frequency);
            delay.delay_ms(TONE_MS).await;
        }
        buzzer.silence();
        delay.delay_ms(CYCLE_GAP_MS).await;
    }
}

impl<B, L, E, D> Ringer for ButtonRinger<B, L, E, D>
where
    B: Buzzer,
    L: OutputPin,
    E: ButtonEvents,
    D: DelayNs,
{
    async fn ring(&mut self, alarm: &Alarm) -> RingOutcome {
        debug!("Ringing for alarm {}", alarm);
        // A press left over from an earlier ring must not answer this one
        self.buttons.reset();
        self.set_leds(true);

        let outcome = match select(
            wait_for_decision(&mut self.buttons),
            play_tones(&mut self.buzzer, &mut self.delay),
        )
        .await
        {
            Either::First(outcome) => outcome,
            Either::Second(never) => match never {},
        };

        self.buzzer.silence();
        self.set_leds(false);
        outcome
    }
}
