use super::DataSaver;
use crate::data_point::{DataName, DataPoint};

/// Saves one sensor channel, at most once per `save_interval_ms`.
///
/// Handlers for several channels can share a saver by each holding a
/// `&mut` to it.
#[derive(Debug)]
pub struct SensorDataHandler<D: DataSaver> {
    data_saver: D,
    name: DataName,
    save_interval_ms: u16,
    last_save_ms: Option<u32>,
    last_data_point_saved: DataPoint,
}

impl<D: DataSaver> SensorDataHandler<D> {
    pub fn new(name: DataName, data_saver: D) -> Self {
        Self {
            data_saver,
            name,
            save_interval_ms: 0,
            last_save_ms: None,
            last_data_point_saved: DataPoint::default(),
        }
    }

    /// Only points more than `interval_ms` after the last saved one are kept.
    pub fn restrict_save_speed(&mut self, interval_ms: u16) {
        self.save_interval_ms = interval_ms;
    }

    /// Returns whether the point was saved.
    pub fn add_data(&mut self, data_point: DataPoint) -> Result<bool, D::Error> {
        let due = self.last_save_ms.is_none_or(|last| {
            data_point.timestamp_ms.wrapping_sub(last) > self.save_interval_ms as u32
        });
        if !due {
            log_trace!("{:?} at {}ms skipped", self.name, data_point.timestamp_ms);
            return Ok(false);
        }

        self.data_saver.save_data_point(data_point, self.name.tag())?;
        self.last_save_ms = Some(data_point.timestamp_ms);
        self.last_data_point_saved = data_point;
        Ok(true)
    }

    pub fn name(&self) -> DataName {
        self.name
    }

    pub fn save_interval_ms(&self) -> u16 {
        self.save_interval_ms
    }

    pub fn last_data_point_saved(&self) -> DataPoint {
        self.last_data_point_saved
    }

    pub fn data_saver(&self) -> &D {
        &self.data_saver
    }

    pub fn data_saver_mut(&mut self) -> &mut D {
        &mut self.data_saver
    }

    pub fn into_data_saver(self) -> D {
        self.data_saver
    }
}
