use core::convert::Infallible;

use super::DataSaver;
use crate::data_point::{DataName, DataPoint};

/// Prints every data point through the logger, for bench runs.
#[derive(Debug, Clone, Default)]
pub struct LogDataSaver {
    saved: u32,
}

impl LogDataSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> u32 {
        self.saved
    }
}

impl DataSaver for LogDataSaver {
    type Error = Infallible;

    fn save_data_point(&mut self, data_point: DataPoint, name: u8) -> Result<(), Self::Error> {
        match DataName::try_from(name) {
            Ok(name) => log_info!("{:?} {} {}", name, data_point.timestamp_ms, data_point.data),
            Err(_) => log_info!("#{} {} {}", name, data_point.timestamp_ms, data_point.data),
        }
        self.saved += 1;
        Ok(())
    }

    fn launch_detected(&mut self, launch_timestamp_ms: u32) -> Result<(), Self::Error> {
        log_info!("Launch at {}ms", launch_timestamp_ms);
        Ok(())
    }
}
