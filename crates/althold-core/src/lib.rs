//! # Althold Core
//!
//! Altitude-hold library for flight controllers, designed for `no_std` environments.
//! This crate contains only the code that needs to run in the control loop:
//! - Altitude/vario estimator (baro, ranger and accelerometer fusion)
//! - Thrust-gated cascade controller (altitude P, velocity PID)
//! - Hold-mode activation state machine
//! - Airframe output adapters (multirotor throttle, fixed-wing pitch)
//!
//! # Features
//! - `std`: Enable standard library support
//! - `serde`: Serialize/deserialize configuration structs
//! - Default: `no_std` with no allocations (bare metal embedded)

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod config;
pub mod controller;
pub mod estimator;
pub mod hold;
pub mod math;
pub mod mode;
pub mod output;
pub mod sensors;
pub mod taps;

// Re-export core types
pub use config::{AltHoldConfig, Airframe, ConfigError, Gain, PidGains};
pub use controller::{CascadeController, ControlState};
pub use estimator::{AltitudeEstimator, EstimateStatus, VerticalSample};
pub use hold::{AltitudeHold, ModeSwitches, TickInput};
pub use mode::{HoldSource, ModeFlags, ModeLatch, ModeTransition};
pub use output::{OutputAdapter, RcCommand, RcData};
pub use sensors::{AccelAccumulator, AccelWindow, Attitude, Barometer, Ranger, Sensors};
pub use taps::DebugTaps;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
