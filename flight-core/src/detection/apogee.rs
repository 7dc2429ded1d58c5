use crate::data_point::DataPoint;
use crate::estimation::VerticalVelocityEstimator;

pub const DEFAULT_APOGEE_THRESHOLD_M: f32 = 1.0;

/// Latches apogee once the estimated altitude has dropped `threshold_m`
/// below the highest altitude seen while the estimated velocity is negative.
#[derive(Debug, Clone)]
pub struct ApogeeDetector {
    threshold_m: f32,
    max_altitude_m: f32,
    max_altitude_timestamp_ms: u32,
    apogee_detected: bool,
    estimated_altitude_m: f32,
    estimated_velocity: f32,
}

impl Default for ApogeeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_APOGEE_THRESHOLD_M)
    }
}

impl ApogeeDetector {
    pub fn new(threshold_m: f32) -> Self {
        Self {
            threshold_m,
            max_altitude_m: 0.0,
            max_altitude_timestamp_ms: 0,
            apogee_detected: false,
            estimated_altitude_m: 0.0,
            estimated_velocity: 0.0,
        }
    }

    pub fn init(&mut self, initial_altitude_m: f32, initial_timestamp_ms: u32) {
        self.max_altitude_m = initial_altitude_m;
        self.max_altitude_timestamp_ms = initial_timestamp_ms;
        self.apogee_detected = false;
        self.estimated_altitude_m = initial_altitude_m;
        self.estimated_velocity = 0.0;
    }

    pub fn update(&mut self, estimator: &VerticalVelocityEstimator) {
        let altitude = estimator.estimated_altitude();
        let velocity = estimator.estimated_velocity();
        self.estimated_altitude_m = altitude;
        self.estimated_velocity = velocity;

        if altitude > self.max_altitude_m {
            self.max_altitude_m = altitude;
            self.max_altitude_timestamp_ms = estimator.timestamp_ms();
        }

        if !self.apogee_detected
            && self.max_altitude_m - altitude >= self.threshold_m
            && velocity < 0.0
        {
            self.apogee_detected = true;
            log_info!(
                "Apogee detected: {}m at {}ms",
                self.max_altitude_m,
                self.max_altitude_timestamp_ms
            );
        }
    }

    pub fn is_apogee_detected(&self) -> bool {
        self.apogee_detected
    }

    /// `(timestamp, altitude)` of the highest point, zeroed until detected.
    pub fn apogee(&self) -> DataPoint {
        if self.apogee_detected {
            DataPoint::new(self.max_altitude_timestamp_ms, self.max_altitude_m)
        } else {
            DataPoint::default()
        }
    }

    pub fn max_altitude_m(&self) -> f32 {
        self.max_altitude_m
    }

    pub fn estimated_altitude_m(&self) -> f32 {
        self.estimated_altitude_m
    }

    pub fn estimated_velocity(&self) -> f32 {
        self.estimated_velocity
    }

    pub fn threshold_m(&self) -> f32 {
        self.threshold_m
    }
}
