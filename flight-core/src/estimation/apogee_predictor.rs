use super::VerticalVelocityEstimator;

pub const DEFAULT_DECELERATION_ALPHA: f32 = 0.2;
pub const DEFAULT_MINIMUM_CLIMB_VELOCITY: f32 = 1.0;
const MINIMUM_VALID_DECELERATION: f32 = 1e-6;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApogeePrediction {
    pub time_to_apogee_s: f32,
    pub timestamp_ms: u32,
    pub altitude_m: f32,
}

/// Ballistic apogee forecast during coast.
///
/// Deceleration is an EMA over samples that average the estimator's inertial
/// acceleration with the finite difference of its velocity, both clamped to
/// `>= 0`. With a constant deceleration `d`, apogee is reached in `v / d`.
#[derive(Debug, Clone)]
pub struct ApogeePredictor {
    alpha: f32,
    minimum_climb_velocity: f32,
    filtered_deceleration: f32,
    prediction: Option<ApogeePrediction>,
    last_timestamp_ms: u32,
    last_velocity: f32,
}

impl Default for ApogeePredictor {
    fn default() -> Self {
        Self::new(DEFAULT_DECELERATION_ALPHA, DEFAULT_MINIMUM_CLIMB_VELOCITY)
    }
}

impl ApogeePredictor {
    pub fn new(alpha: f32, minimum_climb_velocity: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            minimum_climb_velocity,
            filtered_deceleration: 0.0,
            prediction: None,
            last_timestamp_ms: 0,
            last_velocity: 0.0,
        }
    }

    pub fn update(&mut self, estimator: &VerticalVelocityEstimator) {
        let timestamp_ms = estimator.timestamp_ms();
        let velocity = estimator.estimated_velocity();

        let mut sample = (-estimator.inertial_vertical_acceleration()).max(0.0);
        if timestamp_ms > self.last_timestamp_ms {
            let dt = (timestamp_ms - self.last_timestamp_ms) as f32 / 1000.0;
            let finite_difference = (-(velocity - self.last_velocity) / dt).max(0.0);
            sample = 0.5 * (sample + finite_difference);
        }
        self.filtered_deceleration =
            self.alpha * sample + (1.0 - self.alpha) * self.filtered_deceleration;

        self.prediction = if velocity > self.minimum_climb_velocity
            && self.filtered_deceleration > MINIMUM_VALID_DECELERATION
        {
            let t = velocity / self.filtered_deceleration;
            Some(ApogeePrediction {
                time_to_apogee_s: t,
                timestamp_ms: timestamp_ms.wrapping_add((t * 1000.0) as u32),
                altitude_m: estimator.estimated_altitude() + velocity * t
                    - 0.5 * self.filtered_deceleration * t * t,
            })
        } else {
            None
        };

        self.last_timestamp_ms = timestamp_ms;
        self.last_velocity = velocity;
    }

    pub fn is_prediction_valid(&self) -> bool {
        self.prediction.is_some()
    }

    pub fn prediction(&self) -> Option<ApogeePrediction> {
        self.prediction
    }

    /// 0 when there is no valid prediction.
    pub fn time_to_apogee_s(&self) -> f32 {
        self.prediction.map_or(0.0, |p| p.time_to_apogee_s)
    }

    pub fn predicted_apogee_timestamp_ms(&self) -> u32 {
        self.prediction.map_or(0, |p| p.timestamp_ms)
    }

    pub fn predicted_apogee_altitude_m(&self) -> f32 {
        self.prediction.map_or(0.0, |p| p.altitude_m)
    }

    pub fn filtered_deceleration(&self) -> f32 {
        self.filtered_deceleration
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data_point::{AccelerationTriplet, DataPoint};
    use crate::estimation::GRAVITY;

    /// Drag-free coast: the only deceleration is gravity.
    fn coast(initial_velocity: f32, steps: u32) -> (VerticalVelocityEstimator, ApogeePredictor) {
        let mut estimator = VerticalVelocityEstimator::default();
        let mut predictor = ApogeePredictor::default();

        estimator.update(
            &AccelerationTriplet::at(0, 0.0, 0.0, GRAVITY),
            &DataPoint::new(0, 0.0),
        );

        let mut altitude = 0.0;
        let mut velocity = initial_velocity;
        for i in 1..=steps {
            let timestamp_ms = i * 10;
            velocity -= GRAVITY * 0.01;
            altitude += velocity * 0.01;
            // accelerometer reads ~0 in free fall
            estimator.update(
                &AccelerationTriplet::at(timestamp_ms, 0.0, 0.0, 0.01),
                &DataPoint::new(timestamp_ms, altitude),
            );
            predictor.update(&estimator);
        }
        (estimator, predictor)
    }

    #[test]
    fn predicts_ballistic_apogee() {
        let (estimator, predictor) = coast(100.0, 400);
        assert!(predictor.is_prediction_valid());
        assert_relative_eq!(predictor.filtered_deceleration(), GRAVITY, max_relative = 0.1);

        let velocity = estimator.estimated_velocity();
        let expected_altitude =
            estimator.estimated_altitude() + velocity * velocity / (2.0 * GRAVITY);
        assert_relative_eq!(
            predictor.predicted_apogee_altitude_m(),
            expected_altitude,
            max_relative = 0.05
        );
        assert!(predictor.predicted_apogee_timestamp_ms() > estimator.timestamp_ms());
    }

    #[test]
    fn invalid_once_descending() {
        let (_, predictor) = coast(20.0, 400);
        assert!(!predictor.is_prediction_valid());
        assert_eq!(predictor.time_to_apogee_s(), 0.0);
        assert_eq!(predictor.predicted_apogee_timestamp_ms(), 0);
    }

    #[test]
    fn no_deceleration_no_prediction() {
        let mut estimator = VerticalVelocityEstimator::default();
        let mut predictor = ApogeePredictor::default();
        estimator.update(
            &AccelerationTriplet::at(0, 0.0, 0.0, GRAVITY),
            &DataPoint::new(0, 0.0),
        );
        predictor.update(&estimator);
        assert!(!predictor.is_prediction_valid());
        assert_eq!(predictor.filtered_deceleration(), 0.0);
    }
}
