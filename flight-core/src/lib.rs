// only use std when feature = "std" is enabled or during testing
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

pub mod circular_array;
pub mod config;
pub mod data_point;
pub mod data_saver;
pub mod detection;
pub mod estimation;
pub mod state_machine;
pub mod time;

pub use circular_array::CircularArray;
pub use config::FlightProfile;
pub use data_point::{AccelerationTriplet, DataName, DataPoint};
pub use data_saver::{DataSaver, FlashDataSaver, FlashDataSaverConfig};
pub use detection::{ApogeeDetector, LaunchDetector};
pub use estimation::{ApogeePredictor, GroundLevelEstimator, VerticalVelocityEstimator};
pub use state_machine::{BurnoutStateMachine, FlightState, FlightStateMachine, StateMachine};
pub use time::Clock;

#[cfg(test)]
mod tests;
