use crate::config::FlightProfile;
use crate::data_point::{AccelerationTriplet, DataName, DataPoint};
use crate::data_saver::DataSaver;
use crate::detection::{ApogeeDetector, LaunchDetector};
use crate::estimation::VerticalVelocityEstimator;

/// Flight phases, ordered by how far into the flight they occur.
/// The discriminant is what gets logged on a state change.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FlightState {
    Unarmed = 0,
    Armed = 1,
    SoftAscent = 2,
    Ascent = 3,
    PoweredAscent = 4,
    CoastAscent = 5,
    Descent = 6,
    DrogueDeployed = 7,
    MainDeployed = 8,
    Landed = 9,
}

pub trait FlightStateMachine {
    /// Feeds one sensor tick. Returns the new state if this tick caused a transition.
    fn update(
        &mut self,
        acceleration: &AccelerationTriplet,
        altitude: &DataPoint,
    ) -> Option<FlightState>;

    fn state(&self) -> FlightState;
}

/// Detectors, estimator and sink shared by both state machines.
#[derive(Debug)]
struct FlightPipeline<D: DataSaver> {
    data_saver: D,
    launch_detector: LaunchDetector,
    apogee_detector: ApogeeDetector,
    estimator: VerticalVelocityEstimator,
}

impl<D: DataSaver> FlightPipeline<D> {
    fn new(profile: &FlightProfile, data_saver: D) -> Self {
        Self {
            data_saver,
            launch_detector: LaunchDetector::with_tolerance(
                profile.launch_acceleration_threshold_ms2,
                profile.launch_window_size_ms,
                profile.launch_window_interval_ms,
                profile.launch_window_tolerance,
            ),
            apogee_detector: ApogeeDetector::new(profile.apogee_threshold_m),
            estimator: VerticalVelocityEstimator::new(profile.noise),
        }
    }

    /// Returns true once the launch detector has latched. Puts the sink into
    /// post-launch mode and arms the apogee detector.
    fn check_launch(
        &mut self,
        acceleration: &AccelerationTriplet,
        altitude: &DataPoint,
        next_state: FlightState,
    ) -> bool {
        self.launch_detector.update(acceleration);
        if !self.launch_detector.is_launched() {
            return false;
        }

        self.record_state_change(next_state, acceleration.x.timestamp_ms);
        if self
            .data_saver
            .launch_detected(self.launch_detector.launched_time_ms())
            .is_err()
        {
            log_warn!("Data saver failed to enter post-launch mode");
        }
        self.apogee_detector
            .init(altitude.data, altitude.timestamp_ms);
        true
    }

    fn check_apogee(&mut self) -> bool {
        self.apogee_detector.update(&self.estimator);
        self.apogee_detector.is_apogee_detected()
    }

    /// Write failures are logged and never change the flight phase.
    fn record_state_change(&mut self, state: FlightState, timestamp_ms: u32) {
        log_info!("Flight state -> {:?} at {}ms", state, timestamp_ms);
        let data_point = DataPoint::new(timestamp_ms, state as u8 as f32);
        if self
            .data_saver
            .save_data_point(data_point, DataName::StateChange.tag())
            .is_err()
        {
            log_warn!("Failed to log state change to {:?}", state);
        }
    }
}

macro_rules! pipeline_accessors {
    ($machine:ident) => {
        impl<D: $crate::data_saver::DataSaver> $machine<D> {
            pub fn data_saver(&self) -> &D {
                &self.pipeline.data_saver
            }

            pub fn data_saver_mut(&mut self) -> &mut D {
                &mut self.pipeline.data_saver
            }

            pub fn launch_detector(&self) -> &$crate::detection::LaunchDetector {
                &self.pipeline.launch_detector
            }

            pub fn apogee_detector(&self) -> &$crate::detection::ApogeeDetector {
                &self.pipeline.apogee_detector
            }

            pub fn estimator(&self) -> &$crate::estimation::VerticalVelocityEstimator {
                &self.pipeline.estimator
            }

            pub fn into_data_saver(self) -> D {
                self.pipeline.data_saver
            }
        }
    };
}

pub(crate) use pipeline_accessors;

mod burnout;
mod standard;

pub use burnout::BurnoutStateMachine;
pub use standard::StateMachine;
