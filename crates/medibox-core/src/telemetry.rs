//! Outbound telemetry over the publish/subscribe link.

use core::fmt::Write;

use heapless::String;
use log::{info, warn};

/// Text form of one published scalar
pub type Payload = String<24>;

/// Full topic path (`<prefix>/<leaf>`)
pub type TopicPath = String<64>;

/// Debug summaries are truncated to this many bytes
pub const DEBUG_MESSAGE_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Averaged light intensity of a send cycle
    Ldr,
    Temperature,
    ServoAngle,
    /// Inbound configuration messages
    Config,
    /// Free-form diagnostics
    Debug,
}

impl Topic {
    pub const fn leaf(self) -> &'static str {
        match self {
            Self::Ldr => "ldr",
            Self::Temperature => "temperature",
            Self::ServoAngle => "servo_angle",
            Self::Config => "config",
            Self::Debug => "debug",
        }
    }

    /// Join the topic under `prefix`. Returns `None` if the result does not fit.
    pub fn path(self, prefix: &str) -> Option<TopicPath> {
        let mut path = TopicPath::new();
        if prefix.is_empty() {
            path.push_str(self.leaf()).ok()?;
        } else {
            write!(path, "{}/{}", prefix.trim_end_matches('/'), self.leaf()).ok()?;
        }
        Some(path)
    }
}

/// Format a reading with two decimals, `nan` for a missing value.
pub fn format_reading(value: f32) -> Payload {
    let mut payload = Payload::new();
    // 24 bytes hold any f32 the device produces with two decimals
    let _ = if value.is_nan() {
        payload.push_str("nan").map_err(|_| core::fmt::Error)
    } else {
        write!(payload, "{:.2}", value)
    };
    payload
}

/// Publishing half of the pub/sub collaborator
pub trait TelemetrySink {
    /// Publish `payload` on `topic`. Returns whether the broker accepted it.
    fn publish(&mut self, topic: Topic, payload: &str) -> impl Future<Output = bool>;
}

/// Outcome of the three scalar publishes of one send cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    pub ldr: bool,
    pub temperature: bool,
    pub angle: bool,
}

impl PublishReport {
    pub fn all_ok(&self) -> bool {
        self.ldr && self.temperature && self.angle
    }
}

fn status(ok: bool, label: &'static str, failed: &'static str) -> &'static str {
    if ok { label } else { failed }
}

/// Publish one send cycle: intensity, temperature and angle, then a debug
/// summary of which publishes went through.
pub async fn publish_cycle<T: TelemetrySink>(
    sink: &mut T,
    intensity: f32,
    temperature_c: f32,
    angle: f32,
) -> PublishReport {
    let report = PublishReport {
        ldr: sink.publish(Topic::Ldr, &format_reading(intensity)).await,
        temperature: sink
            .publish(Topic::Temperature, &format_reading(temperature_c))
            .await,
        angle: sink
            .publish(Topic::ServoAngle, &format_reading(angle))
            .await,
    };

    let mut summary: String<DEBUG_MESSAGE_LEN> = String::new();
    let _ = write!(
        summary,
        "Published: {}{} | {}{} | {}{}",
        status(report.ldr, "LDR ", "LDR_FAIL "),
        format_reading(intensity),
        status(report.temperature, "TEMP ", "TEMP_FAIL "),
        format_reading(temperature_c),
        status(report.angle, "ANGLE ", "ANGLE_FAIL "),
        format_reading(angle)
    );

    if report.all_ok() {
        info!("{}", summary);
    } else {
        warn!("{}", summary);
    }
    sink.publish(Topic::Debug, &summary).await;

    report
}
