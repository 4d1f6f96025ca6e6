//! Hardware-independent core library for the medibox
//!
//! This crate contains the platform-agnostic logic of the medicine-reminder
//! device: light sampling and aggregation, the shade angle controller, the
//! alarm scheduler with its ringing state machine, the runtime config store,
//! and the cooperative polling loop that drives them.
//!
//! Hardware is reached only through traits (`embedded-hal` pins and PWM,
//! plus the small device traits in [`sensors`], [`actuators`],
//! [`telemetry`] and [`clock`]). It is `#![no_std]` so it compiles on both
//! the embedded target and desktop hosts (for the simulator and tests).

#![no_std]

pub mod actuators;
pub mod alarm;
pub mod app;
pub mod clock;
pub mod config;
pub mod control;
pub mod input;
pub mod metrics;
pub mod sampling;
pub mod sensors;
pub mod telemetry;
