//! Simulator settings: a TOML file overlaid with command-line flags.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};

use medibox_core::clock::DEFAULT_UTC_OFFSET_SECS;
use medibox_core::config::{ControlConfig, NetworkConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Desktop simulator for the medibox medicine reminder")]
pub struct Args {
    /// Settings file (TOML)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Log telemetry instead of publishing it to a broker
    #[arg(long)]
    pub offline: bool,

    /// MQTT broker host
    #[arg(long)]
    pub broker: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    pub port: Option<u16>,

    /// Extra alarm at HH:MM, may be repeated
    #[arg(long = "alarm", value_parser = parse_hhmm)]
    pub alarms: Vec<(u8, u8)>,

    /// Pretend the wall clock reads HH:MM at startup
    #[arg(long, value_parser = parse_hhmm)]
    pub start_at: Option<(u8, u8)>,

    /// Local time offset from UTC in seconds
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset: Option<i32>,
}

/// Parse `HH:MM` into hour and minute.
pub fn parse_hhmm(s: &str) -> Result<(u8, u8), String> {
    let (hour, minute) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got {s:?}"))?;
    let hour: u8 = hour.parse().map_err(|_| format!("bad hour in {s:?}"))?;
    let minute: u8 = minute.parse().map_err(|_| format!("bad minute in {s:?}"))?;
    if hour >= 24 || minute >= 60 {
        return Err(format!("{s:?} is not a time of day"));
    }
    Ok((hour, minute))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub utc_offset_secs: i32,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            utc_offset_secs: DEFAULT_UTC_OFFSET_SECS,
        }
    }
}

/// Shape of the synthetic sensor signals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Mean light intensity, 0 to 1
    pub light_level: f32,
    pub light_swing: f32,
    pub light_period_secs: f32,
    pub temperature_c: f32,
    pub temperature_swing: f32,
    pub temperature_period_secs: f32,
    pub humidity_percent: f32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            light_level: 0.5,
            light_swing: 0.3,
            light_period_secs: 60.0,
            temperature_c: 27.0,
            temperature_swing: 3.0,
            temperature_period_secs: 300.0,
            humidity_percent: 60.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub network: NetworkConfig,
    pub control: ControlConfig,
    pub clock: ClockSettings,
    pub simulation: Simulation,
}

impl Settings {
    /// Load the settings file if one is given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
                let settings = Self::from_toml(&text)?;
                info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse settings, rejecting a `[control]` table the device would refuse
    /// as a config message.
    pub fn from_toml(text: &str) -> Result<Self, Box<dyn Error>> {
        let settings: Settings = toml::from_str(text)?;
        settings
            .control
            .validate()
            .map_err(|e| format!("invalid [control] settings: {e}"))?;
        Ok(settings)
    }

    /// Apply command-line overrides.
    pub fn merge_args(&mut self, args: &Args) -> Result<(), Box<dyn Error>> {
        if let Some(broker) = &args.broker {
            self.network.broker_host = heapless::String::from_str(broker)
                .map_err(|_| format!("broker host {broker:?} is too long"))?;
        }
        if let Some(port) = args.port {
            self.network.broker_port = port;
        }
        if let Some(offset) = args.utc_offset {
            self.clock.utc_offset_secs = offset;
        }
        Ok(())
    }
}
