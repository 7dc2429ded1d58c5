use super::{FlightPipeline, FlightState, FlightStateMachine, pipeline_accessors};
use crate::config::FlightProfile;
use crate::data_point::{AccelerationTriplet, DataPoint};
use crate::data_saver::DataSaver;

/// Armed → PoweredAscent → CoastAscent → Descent.
///
/// Burnout is declared on the first tick after launch where the estimator's
/// inertial vertical acceleration is no longer positive.
#[derive(Debug)]
pub struct BurnoutStateMachine<D: DataSaver> {
    pipeline: FlightPipeline<D>,
    state: FlightState,
}

impl<D: DataSaver> BurnoutStateMachine<D> {
    pub fn new(profile: &FlightProfile, data_saver: D) -> Self {
        Self {
            pipeline: FlightPipeline::new(profile, data_saver),
            state: FlightState::Armed,
        }
    }
}

pipeline_accessors!(BurnoutStateMachine);

impl<D: DataSaver> FlightStateMachine for BurnoutStateMachine<D> {
    fn update(
        &mut self,
        acceleration: &AccelerationTriplet,
        altitude: &DataPoint,
    ) -> Option<FlightState> {
        self.pipeline.estimator.update(acceleration, altitude);
        let timestamp_ms = acceleration.x.timestamp_ms;

        let next_state = match self.state {
            FlightState::Armed => self
                .pipeline
                .check_launch(acceleration, altitude, FlightState::PoweredAscent)
                .then_some(FlightState::PoweredAscent),
            FlightState::PoweredAscent => {
                // keep the max altitude current through the burn
                self.pipeline.check_apogee();
                if self.pipeline.estimator.inertial_vertical_acceleration() <= 0.0 {
                    self.pipeline
                        .record_state_change(FlightState::CoastAscent, timestamp_ms);
                    Some(FlightState::CoastAscent)
                } else {
                    None
                }
            }
            FlightState::CoastAscent => {
                if self.pipeline.check_apogee() {
                    self.pipeline
                        .record_state_change(FlightState::Descent, timestamp_ms);
                    Some(FlightState::Descent)
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(state) = next_state {
            self.state = state;
        }
        next_state
    }

    fn state(&self) -> FlightState {
        self.state
    }
}
