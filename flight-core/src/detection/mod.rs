mod apogee;
mod launch;

pub use apogee::{ApogeeDetector, DEFAULT_APOGEE_THRESHOLD_M};
pub use launch::{DEFAULT_WINDOW_TOLERANCE, LaunchDetector, LaunchDetectorStatus};
