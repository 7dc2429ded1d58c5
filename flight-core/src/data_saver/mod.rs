use core::fmt::Debug;

use crate::data_point::{DataName, DataPoint};

mod dump;
mod flash;
mod flash_saver;
mod log_saver;
mod memory_saver;
mod records;
mod sensor_data_handler;
mod serial_saver;
#[cfg(any(test, feature = "std"))]
mod simulated_flash;

pub use dump::{
    ACK, DUMP_ACK_TIMEOUT_MS, DUMP_SYNC, DumpReport, DumpStatus, END_TAG, PAGE_TAG,
};
pub use flash::{Flash, FlashWaitError, MAX_BUSY_POLLS, wait_until_ready};
pub use flash_saver::{
    DATA_START_ADDRESS, DEFAULT_DATA_POINTS_PER_MINUTE, FlashDataSaver, FlashDataSaverConfig, FlashDataSaverError,
    METADATA_ADDRESS, PAGE_SIZE, SECTOR_SIZE,
};
pub use log_saver::LogDataSaver;
pub use memory_saver::{MemoryDataSaver, MemoryDataSaverError};
pub use records::{
    DataRecord, ERASED_BYTE, LaunchMetadata, LogRecord, POST_LAUNCH_FLAG_SET, RECORD_SIZE,
    TimestampRecord, decode_page,
};
pub use sensor_data_handler::SensorDataHandler;
pub use serial_saver::{
    SERIAL_FRAME_SIZE, SERIAL_FRAME_TERMINATOR, SerialDataSaver, SerialDataSaverError, SerialFrame,
};
#[cfg(any(test, feature = "std"))]
pub use simulated_flash::{SimulatedFlash, SimulatedFlashError};

/// Append-only sink for named samples.
///
/// The flight logic only ever talks to this trait, so a flash log, a serial
/// stream and a test double are interchangeable.
pub trait DataSaver {
    type Error: Debug;

    fn save_data_point(&mut self, data_point: DataPoint, name: u8) -> Result<(), Self::Error>;

    fn save(&mut self, timestamp_ms: u32, value: f32, name: DataName) -> Result<(), Self::Error> {
        self.save_data_point(DataPoint::new(timestamp_ms, value), name.tag())
    }

    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once by the state machine when launch is detected.
    fn launch_detected(&mut self, _launch_timestamp_ms: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: DataSaver + ?Sized> DataSaver for &mut T {
    type Error = T::Error;

    fn save_data_point(&mut self, data_point: DataPoint, name: u8) -> Result<(), Self::Error> {
        T::save_data_point(self, data_point, name)
    }

    fn begin(&mut self) -> Result<(), Self::Error> {
        T::begin(self)
    }

    fn launch_detected(&mut self, launch_timestamp_ms: u32) -> Result<(), Self::Error> {
        T::launch_detected(self, launch_timestamp_ms)
    }
}
