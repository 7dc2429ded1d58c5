use serde::{Deserialize, Serialize};

use crate::detection::{DEFAULT_APOGEE_THRESHOLD_M, DEFAULT_WINDOW_TOLERANCE};
use crate::estimation::NoiseVariances;

/// Detector and estimator tuning for one flight.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightProfile {
    pub launch_acceleration_threshold_ms2: f32,
    pub launch_window_size_ms: u16,
    pub launch_window_interval_ms: u16,
    /// fraction of `launch_window_interval_ms`
    pub launch_window_tolerance: f32,
    pub apogee_threshold_m: f32,
    pub noise: NoiseVariances,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            launch_acceleration_threshold_ms2: 30.0,
            launch_window_size_ms: 1000,
            launch_window_interval_ms: 100,
            launch_window_tolerance: DEFAULT_WINDOW_TOLERANCE,
            apogee_threshold_m: DEFAULT_APOGEE_THRESHOLD_M,
            noise: NoiseVariances::default(),
        }
    }
}
