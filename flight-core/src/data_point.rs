use core::cmp::Ordering;

use int_enum::IntEnum;
use serde::{Deserialize, Serialize};

/// A timestamped scalar sample. Ordering and equality look at `data` only,
/// so windows of samples can be ranked by value.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp_ms: u32,
    pub data: f32,
}

impl DataPoint {
    pub const fn new(timestamp_ms: u32, data: f32) -> Self {
        Self { timestamp_ms, data }
    }
}

impl PartialEq for DataPoint {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl PartialOrd for DataPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.data.partial_cmp(&other.data)
    }
}

/// One accelerometer reading, one `DataPoint` per body axis (m/s²).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelerationTriplet {
    pub x: DataPoint,
    pub y: DataPoint,
    pub z: DataPoint,
}

impl AccelerationTriplet {
    pub const fn new(x: DataPoint, y: DataPoint, z: DataPoint) -> Self {
        Self { x, y, z }
    }

    /// Same timestamp on all three axes.
    pub const fn at(timestamp_ms: u32, x: f32, y: f32, z: f32) -> Self {
        Self {
            x: DataPoint::new(timestamp_ms, x),
            y: DataPoint::new(timestamp_ms, y),
            z: DataPoint::new(timestamp_ms, z),
        }
    }

    pub fn as_array(&self) -> [DataPoint; 3] {
        [self.x, self.y, self.z]
    }

    pub fn magnitude_squared(&self) -> f32 {
        self.x.data * self.x.data + self.y.data * self.y.data + self.z.data * self.z.data
    }

    pub fn average_timestamp_ms(&self) -> u32 {
        let sum =
            self.x.timestamp_ms as u64 + self.y.timestamp_ms as u64 + self.z.timestamp_ms as u64;
        (sum / 3) as u32
    }
}

/// Channel tags written alongside every logged `DataPoint`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
#[repr(u8)]
pub enum DataName {
    AccelerometerX = 0,
    AccelerometerY = 1,
    AccelerometerZ = 2,
    GyroscopeX = 3,
    GyroscopeY = 4,
    GyroscopeZ = 5,
    Temperature = 6,
    Pressure = 7,
    Altitude = 8,
    MagnetometerX = 9,
    MagnetometerY = 10,
    MagnetometerZ = 11,
    MedianAccelerationSquared = 12,
    AverageCycleRate = 13,
    Timestamp = 14,
    StateChange = 15,
    EstimatedAltitude = 16,
    EstimatedVelocity = 17,
}

impl DataName {
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_ignores_timestamp() {
        let a = DataPoint::new(10, 1.0);
        let b = DataPoint::new(999, 1.0);
        let c = DataPoint::new(0, 2.0);
        assert_eq!(a, b);
        assert!(a < c);
        assert!(c > b);
    }

    #[test]
    fn triplet_average_timestamp_does_not_overflow() {
        let triplet = AccelerationTriplet::new(
            DataPoint::new(u32::MAX, 0.0),
            DataPoint::new(u32::MAX, 0.0),
            DataPoint::new(u32::MAX - 3, 0.0),
        );
        assert_eq!(triplet.average_timestamp_ms(), u32::MAX - 1);
    }

    #[test]
    fn data_name_tags_are_stable() {
        assert_eq!(DataName::Timestamp.tag(), 14);
        assert_eq!(DataName::StateChange.tag(), 15);
        assert_eq!(DataName::try_from(7u8), Ok(DataName::Pressure));
        assert!(DataName::try_from(200u8).is_err());
    }
}
