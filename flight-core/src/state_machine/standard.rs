use super::{FlightPipeline, FlightState, FlightStateMachine, pipeline_accessors};
use crate::config::FlightProfile;
use crate::data_point::{AccelerationTriplet, DataPoint};
use crate::data_saver::DataSaver;

/// Armed → Ascent → Descent.
#[derive(Debug)]
pub struct StateMachine<D: DataSaver> {
    pipeline: FlightPipeline<D>,
    state: FlightState,
}

impl<D: DataSaver> StateMachine<D> {
    pub fn new(profile: &FlightProfile, data_saver: D) -> Self {
        Self {
            pipeline: FlightPipeline::new(profile, data_saver),
            state: FlightState::Armed,
        }
    }
}

pipeline_accessors!(StateMachine);

impl<D: DataSaver> FlightStateMachine for StateMachine<D> {
    fn update(
        &mut self,
        acceleration: &AccelerationTriplet,
        altitude: &DataPoint,
    ) -> Option<FlightState> {
        self.pipeline.estimator.update(acceleration, altitude);

        let next_state = match self.state {
            FlightState::Armed => self
                .pipeline
                .check_launch(acceleration, altitude, FlightState::Ascent)
                .then_some(FlightState::Ascent),
            FlightState::Ascent => {
                if self.pipeline.check_apogee() {
                    self.pipeline
                        .record_state_change(FlightState::Descent, acceleration.x.timestamp_ms);
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
