use heapless::Vec;

use super::DataSaver;
use crate::data_point::DataPoint;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryDataSaverError {
    Full,
}

/// Keeps up to `N` records in RAM.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSaver<const N: usize> {
    records: Vec<(DataPoint, u8), N>,
    launch_timestamp_ms: Option<u32>,
}

impl<const N: usize> MemoryDataSaver<N> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            launch_timestamp_ms: None,
        }
    }

    pub fn records(&self) -> &[(DataPoint, u8)] {
        &self.records
    }

    pub fn launch_timestamp_ms(&self) -> Option<u32> {
        self.launch_timestamp_ms
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.launch_timestamp_ms = None;
    }
}

impl<const N: usize> DataSaver for MemoryDataSaver<N> {
    type Error = MemoryDataSaverError;

    fn save_data_point(&mut self, data_point: DataPoint, name: u8) -> Result<(), Self::Error> {
        self.records
            .push((data_point, name))
            .map_err(|_| MemoryDataSaverError::Full)
    }

    fn launch_detected(&mut self, launch_timestamp_ms: u32) -> Result<(), Self::Error> {
        self.launch_timestamp_ms.get_or_insert(launch_timestamp_ms);
        Ok(())
    }
}
