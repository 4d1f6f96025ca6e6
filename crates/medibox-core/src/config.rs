//! Runtime configuration: control tunables and network settings.
//!
//! Control tunables can be replaced at runtime by a comma-delimited message
//! received on the config topic. Messages are queued in a [`ConfigInbox`]
//! by whichever task receives them and applied by the polling loop itself,
//! so every reader sees either the old or the new configuration in full.

use core::str::FromStr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Duration;
use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

pub const DEFAULT_SAMPLE_PERIOD_MS: u32 = 1000;
pub const DEFAULT_SEND_PERIOD_MS: u32 = 5000;
pub const DEFAULT_ANGLE_OFFSET_DEG: f32 = 30.0;
pub const DEFAULT_GAIN: f32 = 0.75;
pub const DEFAULT_REFERENCE_TEMP_C: f32 = 30.0;

/// Upper end of the servo travel in degrees
pub const MAX_ANGLE_DEG: f32 = 180.0;

/// Number of comma-separated fields in a config message
const CONFIG_FIELDS: usize = 5;

/// Maximum length of a queued config message in bytes
pub const CONFIG_MESSAGE_LEN: usize = 64;

/// Depth of the config inbox
pub const CONFIG_INBOX_DEPTH: usize = 4;

pub type ConfigMessage = String<CONFIG_MESSAGE_LEN>;

/// Channel carrying raw config messages from the network task to the loop
pub type ConfigInbox = Channel<CriticalSectionRawMutex, ConfigMessage, CONFIG_INBOX_DEPTH>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("expected 5 comma-separated fields, got {0}")]
    FieldCount(usize),
    #[error("field `{0}` is not a valid number")]
    InvalidNumber(&'static str),
    #[error("field `{0}` must be non-zero")]
    ZeroPeriod(&'static str),
    #[error("angle offset {0} is outside 0..=180 degrees")]
    OffsetOutOfRange(f32),
    #[error("message longer than 64 bytes")]
    TooLong,
    #[error("config inbox is full")]
    InboxFull,
}

/// Tunable parameters of the sampling loop and angle controller
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    pub sample_period_ms: u32,
    pub send_period_ms: u32,
    pub angle_offset_deg: f32,
    pub gain: f32,
    pub reference_temp_c: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
            send_period_ms: DEFAULT_SEND_PERIOD_MS,
            angle_offset_deg: DEFAULT_ANGLE_OFFSET_DEG,
            gain: DEFAULT_GAIN,
            reference_temp_c: DEFAULT_REFERENCE_TEMP_C,
        }
    }
}

impl ControlConfig {
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms as u64)
    }

    pub fn send_period(&self) -> Duration {
        Duration::from_millis(self.send_period_ms as u64)
    }

    pub fn sample_secs(&self) -> f32 {
        self.sample_period_ms as f32 / 1000.0
    }

    pub fn send_secs(&self) -> f32 {
        self.send_period_ms as f32 / 1000.0
    }

    /// Check the invariants every active configuration must hold: non-zero
    /// periods, finite tunables and an offset inside the servo travel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("sample_period_ms"));
        }
        if self.send_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("send_period_ms"));
        }
        for (value, name) in [
            (self.angle_offset_deg, "angle_offset_deg"),
            (self.gain, "gain"),
            (self.reference_temp_c, "reference_temp_c"),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidNumber(name));
            }
        }
        if !(0.0..=MAX_ANGLE_DEG).contains(&self.angle_offset_deg) {
            return Err(ConfigError::OffsetOutOfRange(self.angle_offset_deg));
        }
        Ok(())
    }
}

fn parse_seconds(field: &str, name: &'static str) -> Result<u32, ConfigError> {
    let secs: u32 = field
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber(name))?;
    if secs == 0 {
        return Err(ConfigError::ZeroPeriod(name));
    }
    secs.checked_mul(1000)
        .ok_or(ConfigError::InvalidNumber(name))
}

fn parse_float(field: &str, name: &'static str) -> Result<f32, ConfigError> {
    field
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ConfigError::InvalidNumber(name))
}

/// Parses `sampleSeconds,sendSeconds,angleOffsetDeg,gain,referenceTempC`.
impl FromStr for ControlConfig {
    type Err = ConfigError;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let count = message.split(',').count();
        if count != CONFIG_FIELDS {
            return Err(ConfigError::FieldCount(count));
        }

        let mut fields = message.split(',');
        let mut next = || fields.next().unwrap_or_default();

        let sample_period_ms = parse_seconds(next(), "sampleSeconds")?;
        let send_period_ms = parse_seconds(next(), "sendSeconds")?;
        let angle_offset_deg = parse_float(next(), "angleOffsetDeg")?;
        let gain = parse_float(next(), "gain")?;
        let reference_temp_c = parse_float(next(), "referenceTempC")?;

        let config = Self {
            sample_period_ms,
            send_period_ms,
            angle_offset_deg,
            gain,
            reference_temp_c,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Single-writer holder of the active [`ControlConfig`]
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: ControlConfig,
}

impl ConfigStore {
    pub const fn new(initial: ControlConfig) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &ControlConfig {
        &self.current
    }

    /// Replace all five fields at once.
    pub fn apply(&mut self, config: ControlConfig) {
        self.current = config;
    }

    /// Parse and apply a config message.
    ///
    /// On error the previous configuration is kept unchanged.
    pub fn apply_message(&mut self, message: &str) -> Result<&ControlConfig, ConfigError> {
        let config = message.parse::<ControlConfig>().map_err(|e| {
            warn!("Rejected config message {:?}: {}", message, e);
            e
        })?;

        self.apply(config);
        info!(
            "New config: sample {}s, send {}s, offset {}°, gain {}, T_ref {}°C",
            config.sample_period_ms / 1000,
            config.send_period_ms / 1000,
            config.angle_offset_deg,
            config.gain,
            config.reference_temp_c
        );

        Ok(&self.current)
    }

    /// Apply every message waiting in `inbox`. Returns how many were accepted.
    pub fn drain_inbox(&mut self, inbox: &ConfigInbox) -> usize {
        let mut accepted = 0;
        while let Ok(message) = inbox.try_receive() {
            if self.apply_message(&message).is_ok() {
                accepted += 1;
            }
        }
        accepted
    }
}

/// Queue a config message without blocking.
///
/// Fails when the message does not fit a [`ConfigMessage`] or the inbox is
/// full; in both cases the message is dropped.
pub fn enqueue_message(inbox: &ConfigInbox, message: &str) -> Result<(), ConfigError> {
    let message = ConfigMessage::from_str(message.trim()).map_err(|_| ConfigError::TooLong)?;
    inbox.try_send(message).map_err(|_| {
        warn!("Config inbox full, dropping message");
        ConfigError::InboxFull
    })
}

/// Connection settings for the WiFi and MQTT collaborators
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String<32>,
    pub password: String<64>,
    pub broker_host: String<64>,
    pub broker_port: u16,
    pub topic_prefix: String<32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: String::from_str("Wokwi-GUEST").unwrap_or_default(),
            password: String::new(),
            broker_host: String::from_str("broker.hivemq.com").unwrap_or_default(),
            broker_port: 1883,
            topic_prefix: String::from_str("220077L/medibox").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControlConfig::default();
        assert_eq!(config.sample_period_ms, 1000);
        assert_eq!(config.send_period_ms, 5000);
        assert_eq!(config.angle_offset_deg, 30.0);
        assert_eq!(config.gain, 0.75);
        assert_eq!(config.reference_temp_c, 30.0);
    }

    #[test]
    fn test_parse_full_message() {
        let config: ControlConfig = "2,10,45.5,1.25,28".parse().unwrap();
        assert_eq!(config.sample_period_ms, 2000);
        assert_eq!(config.send_period_ms, 10000);
        assert_eq!(config.angle_offset_deg, 45.5);
        assert_eq!(config.gain, 1.25);
        assert_eq!(config.reference_temp_c, 28.0);
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let config: ControlConfig = " 1 , 5 , 30 , 0.75 , 30 \n".parse().unwrap();
        assert_eq!(config, ControlConfig::default());
    }

    #[test]
    fn test_malformed_message_keeps_previous_config() {
        let mut store = ConfigStore::new(ControlConfig::default());
        let before = *store.current();

        assert_eq!(
            store.apply_message("5,10,30"),
            Err(ConfigError::FieldCount(3))
        );
        assert_eq!(*store.current(), before, "No field may change on rejection");
    }

    #[test]
    fn test_rejects_bad_fields() {
        assert_eq!(
            "x,5,30,0.75,30".parse::<ControlConfig>(),
            Err(ConfigError::InvalidNumber("sampleSeconds"))
        );
        assert_eq!(
            "1,0,30,0.75,30".parse::<ControlConfig>(),
            Err(ConfigError::ZeroPeriod("sendSeconds"))
        );
        assert_eq!(
            "1,5,30,abc,30".parse::<ControlConfig>(),
            Err(ConfigError::InvalidNumber("gain"))
        );
        assert_eq!(
            "1,5,190,0.75,30".parse::<ControlConfig>(),
            Err(ConfigError::OffsetOutOfRange(190.0))
        );
        assert_eq!(
            "1,5,30,0.75,30,7".parse::<ControlConfig>(),
            Err(ConfigError::FieldCount(6))
        );
    }

    #[test]
    fn test_apply_replaces_all_fields() {
        let mut store = ConfigStore::default();
        let applied = *store.apply_message("3,6,10,2,25").unwrap();

        assert_eq!(applied, *store.current());
        assert_eq!(store.current().sample_period(), Duration::from_millis(3000));
        assert_eq!(store.current().send_period(), Duration::from_millis(6000));
        assert_eq!(store.current().angle_offset_deg, 10.0);
        assert_eq!(store.current().gain, 2.0);
        assert_eq!(store.current().reference_temp_c, 25.0);
    }

    #[test]
    fn test_drain_inbox_applies_in_order() {
        let inbox = ConfigInbox::new();
        let mut store = ConfigStore::default();

        enqueue_message(&inbox, "2,4,10,1,20").unwrap();
        enqueue_message(&inbox, "garbage").unwrap();
        enqueue_message(&inbox, "3,9,15,1,20").unwrap();

        assert_eq!(store.drain_inbox(&inbox), 2);
        assert_eq!(store.current().sample_period_ms, 3000);
        assert_eq!(store.current().angle_offset_deg, 15.0);
        assert!(inbox.try_receive().is_err(), "Inbox must be empty after draining");
    }

    #[test]
    fn test_enqueue_rejects_oversized_message() {
        let inbox = ConfigInbox::new();
        let long = "1111111111111111111111111111111111111111111111111111111111111111,5,30,0.75,30";
        assert_eq!(enqueue_message(&inbox, long), Err(ConfigError::TooLong));
    }

    #[test]
    fn test_enqueue_reports_full_inbox() {
        let inbox = ConfigInbox::new();
        for _ in 0..CONFIG_INBOX_DEPTH {
            enqueue_message(&inbox, "1,5,30,0.75,30").unwrap();
        }
        assert_eq!(
            enqueue_message(&inbox, "1,5,30,0.75,30"),
            Err(ConfigError::InboxFull)
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_fields() {
        assert_eq!(ControlConfig::default().validate(), Ok(()));

        let zero_sample = ControlConfig {
            sample_period_ms: 0,
            ..ControlConfig::default()
        };
        assert_eq!(
            zero_sample.validate(),
            Err(ConfigError::ZeroPeriod("sample_period_ms"))
        );

        let wide_offset = ControlConfig {
            angle_offset_deg: 200.0,
            ..ControlConfig::default()
        };
        assert_eq!(
            wide_offset.validate(),
            Err(ConfigError::OffsetOutOfRange(200.0))
        );

        let infinite_gain = ControlConfig {
            gain: f32::INFINITY,
            ..ControlConfig::default()
        };
        assert_eq!(
            infinite_gain.validate(),
            Err(ConfigError::InvalidNumber("gain"))
        );
    }

    #[test]
    fn test_network_defaults() {
        let network = NetworkConfig::default();
        assert_eq!(network.ssid.as_str(), "Wokwi-GUEST");
        assert_eq!(network.broker_host.as_str(), "broker.hivemq.com");
        assert_eq!(network.broker_port, 1883);
        assert_eq!(network.topic_prefix.as_str(), "220077L/medibox");
    }
}
