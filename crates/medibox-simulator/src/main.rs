//! Desktop simulator for the medibox medicine reminder.
//!
//! Runs the `medibox-core` polling loop against simulated sensors and
//! actuators. Telemetry goes to an MQTT broker (or the log with
//! `--offline`), config messages arrive on the broker's config topic or from
//! the console, and the console stands in for the front-panel buttons. See
//! [`console`] for the commands.

mod console;
mod devices;
mod mqtt;
mod settings;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use embassy_sync::channel::Channel;
use env_logger::Env;
use log::{error, info, warn};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use medibox_core::alarm::{AlarmScheduler, ButtonRinger};
use medibox_core::app::{Devices, MediBox};
use medibox_core::clock::Clock;
use medibox_core::config::ConfigInbox;
use medibox_core::input::DebouncedButtons;
use medibox_core::sensors::LdrSensor;

use crate::console::Request;
use crate::devices::{
    ButtonPanel, ClimateAlert, LoggingBuzzer, LoggingLed, SimulatedAdc, SimulatedDht,
    SimulatedShade, SystemClock, TokioDelay,
};
use crate::mqtt::{MqttTelemetry, OfflineTelemetry, Telemetry};
use crate::settings::{Args, Settings};

/// Pause between two loop iterations
const LOOP_PERIOD: Duration = Duration::from_millis(10);

static CONFIG_INBOX: ConfigInbox = Channel::new();

fn list_alarms(alarms: &AlarmScheduler) {
    if alarms.alarms().is_empty() {
        info!("No alarms");
    }
    for (i, alarm) in alarms.alarms().iter().enumerate() {
        info!(
            "Alarm {}: {}{}",
            i,
            alarm,
            if alarm.triggered { " (done)" } else { "" }
        );
    }
    if let Some(until) = alarms.snooze_until() {
        info!("Snoozed until {} ms after boot", until.as_millis());
    }
}

/// Apply pending console requests. Returns `false` once a quit was asked for.
fn handle_requests<K: Clock>(
    medibox: &mut MediBox<'_, K>,
    requests: &mut UnboundedReceiver<Request>,
) -> bool {
    while let Ok(request) = requests.try_recv() {
        let alarms = medibox.alarms_mut();
        let result = match request {
            Request::AddAlarm { hour, minute } => alarms.add(hour, minute).map(|_| ()),
            Request::DeleteAlarm(index) => alarms.delete(index).map(|_| ()),
            Request::EnableAlarm(index) => alarms.enable(index),
            Request::DisableAlarms => {
                alarms.disable_all();
                Ok(())
            }
            Request::ListAlarms => {
                list_alarms(alarms);
                Ok(())
            }
            Request::Status => {
                let config = medibox.config();
                info!(
                    "Config: sample {} ms, send {} ms, offset {}°, gain {}, T_ref {}°C",
                    config.sample_period_ms,
                    config.send_period_ms,
                    config.angle_offset_deg,
                    config.gain,
                    config.reference_temp_c
                );
                info!(
                    "{} samples buffered, climate {}",
                    medibox.samples().len(),
                    medibox.climate_status().label()
                );
                if let Some(time) = medibox.clock().time_of_day() {
                    info!("Local time {}", time);
                }
                Ok(())
            }
            Request::Quit => return false,
        };
        if let Err(e) = result {
            warn!("Alarm request failed: {}", e);
        }
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.logger.level.as_str()))
        .init();

    if let Err(e) = settings.merge_args(&args) {
        error!("Invalid arguments: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting medibox simulator");

    let mut clock = SystemClock::new(settings.clock.utc_offset_secs);
    if let Some((hour, minute)) = args.start_at {
        clock.start_at(hour, minute);
    }

    let telemetry = if args.offline {
        info!("Offline mode, telemetry is logged only");
        Telemetry::Offline(OfflineTelemetry::new(&settings.network))
    } else {
        Telemetry::Mqtt(MqttTelemetry::connect(&settings.network, &CONFIG_INBOX))
    };

    let panel = ButtonPanel::default();
    let buttons = DebouncedButtons::new(panel.pins(), TokioDelay);
    let ringer = ButtonRinger::new(
        LoggingBuzzer::new("Alarm"),
        [LoggingLed::new("Alarm 1"), LoggingLed::new("Alarm 2")],
        buttons,
        TokioDelay,
    );

    let mut devices = Devices {
        light: LdrSensor::new(SimulatedAdc::new(&settings.simulation)),
        climate: SimulatedDht::new(&settings.simulation),
        shade: SimulatedShade::new(),
        telemetry,
        ringer,
        warning: ClimateAlert::new(),
    };

    let mut medibox = MediBox::new(clock, &CONFIG_INBOX, settings.control);
    for &(hour, minute) in &args.alarms {
        if let Err(e) = medibox.alarms_mut().add(hour, minute) {
            warn!("Alarm {:02}:{:02} not added: {}", hour, minute, e);
        }
    }
    list_alarms(medibox.alarms());

    let (request_tx, mut requests) = unbounded_channel();
    tokio::spawn(console::run(panel, &CONFIG_INBOX, request_tx));

    medibox.start(&mut devices).await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        if !handle_requests(&mut medibox, &mut requests) {
            break;
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = medibox.poll(&mut devices) => {}
        }

        tokio::time::sleep(LOOP_PERIOD).await;
    }

    info!("Simulator exiting");
    ExitCode::SUCCESS
}
