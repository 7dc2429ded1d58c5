mod apogee_predictor;
mod ground_level;
mod vertical_velocity;

pub use apogee_predictor::{
    ApogeePrediction, ApogeePredictor, DEFAULT_DECELERATION_ALPHA, DEFAULT_MINIMUM_CLIMB_VELOCITY,
};
pub use ground_level::{DEFAULT_GROUND_LEVEL_ALPHA, GroundLevelEstimator};
pub use vertical_velocity::{
    Axis, GRAVITY, MINIMUM_DELTA_T_S, NoiseVariances, VerticalAxis, VerticalVelocityEstimator,
};
