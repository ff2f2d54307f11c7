//! Althold Simulation Library
//!
//! Flies the altitude-hold controller against a simulated vehicle: vertical
//! dynamics, noisy barometer/ranger/IMU models and a scripted pilot.

pub mod error;
pub mod params;
pub mod scenario;
pub mod sensor;
pub mod sim;

// Re-export main types
pub use error::SimError;
pub use params::*;
pub use scenario::{run_scenario, HoldResult, HoldStats, Scenario, StickExcursion, TiltExcursion};
pub use sensor::{SensorConfig, SimBarometer, SimImu, SimRanger};
pub use sim::{Vehicle, VehicleParams, VehicleState};
