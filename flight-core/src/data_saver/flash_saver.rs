use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};

use super::flash::{Flash, FlashWaitError, MAX_BUSY_POLLS, wait_until_ready};
use super::records::{
    DataRecord, ERASED_BYTE, LaunchMetadata, RECORD_SIZE, TimestampRecord,
};
use super::DataSaver;
use crate::data_point::{DataName, DataPoint};

pub const SECTOR_SIZE: u32 = 4096;
pub const PAGE_SIZE: usize = 256;
pub const METADATA_ADDRESS: u32 = 0;
/// Sector 0 holds the launch metadata, the log starts at sector 1.
pub const DATA_START_ADDRESS: u32 = SECTOR_SIZE;

/// 100 Hz across 8 channels.
pub const DEFAULT_DATA_POINTS_PER_MINUTE: u32 = 48_000;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashDataSaverConfig {
    /// A timestamp record is written when this much time passed since the last one.
    pub timestamp_interval_ms: u16,
    /// Expected logging rate, sizes the pre-launch window kept at launch.
    pub data_points_per_minute: u32,
    pub max_busy_polls: u32,
}

impl Default for FlashDataSaverConfig {
    fn default() -> Self {
        Self {
            timestamp_interval_ms: 1000,
            data_points_per_minute: DEFAULT_DATA_POINTS_PER_MINUTE,
            max_busy_polls: MAX_BUSY_POLLS,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashDataSaverError<E> {
    Flash(E),
    BusyTimeout,
    Packing,
    /// The chip needs at least the metadata sector and two data sectors.
    FlashTooSmall,
    /// Flight data from before the reset has not been cleared yet.
    RebootedInPostLaunchMode,
    /// The writer caught up with the protected launch window.
    ChipFullDueToPostLaunchProtection,
    /// `0xFF` reads as blank flash and `14` as a timestamp record.
    ReservedName(u8),
}

impl<E> From<FlashWaitError<E>> for FlashDataSaverError<E> {
    fn from(error: FlashWaitError<E>) -> Self {
        match error {
            FlashWaitError::Flash(e) => Self::Flash(e),
            FlashWaitError::BusyTimeout => Self::BusyTimeout,
        }
    }
}

impl<E> From<PackingError> for FlashDataSaverError<E> {
    fn from(_: PackingError) -> Self {
        Self::Packing
    }
}

/// Wrap-around flash log.
///
/// Records are collected in a page buffer and written a page at a time.
/// Entering a sector erases it first. The data region wraps back to
/// `DATA_START_ADDRESS` at the end of the chip.
///
/// Once launch is reported, the saver rolls back about a minute of records,
/// persists that address in sector 0 and from then on refuses to wrap into
/// it. Data from launch onward and the minute before it can only be removed
/// with `clear_post_launch_mode` or `erase_all_data`.
#[derive(Debug)]
pub struct FlashDataSaver<F: Flash> {
    flash: F,
    config: FlashDataSaverConfig,
    buffer: [u8; PAGE_SIZE],
    buffer_len: usize,
    next_write_address: u32,
    last_timestamp_ms: Option<u32>,
    last_data_point: DataPoint,
    post_launch_mode: bool,
    rebooted_in_post_launch_mode: bool,
    launch_write_address: u32,
    chip_full_due_to_post_launch_protection: bool,
    /// Post-launch mode is latched in RAM but sector 0 does not say so yet.
    launch_metadata_pending: bool,
}

impl<F: Flash> FlashDataSaver<F> {
    pub fn new(flash: F, config: FlashDataSaverConfig) -> Self {
        Self {
            flash,
            config,
            buffer: [ERASED_BYTE; PAGE_SIZE],
            buffer_len: 0,
            next_write_address: DATA_START_ADDRESS,
            last_timestamp_ms: None,
            last_data_point: DataPoint::default(),
            post_launch_mode: false,
            rebooted_in_post_launch_mode: false,
            launch_write_address: 0,
            chip_full_due_to_post_launch_protection: false,
            launch_metadata_pending: false,
        }
    }

    /// Writes the partially filled page buffer, padding it with erased bytes.
    ///
    /// Returns `ChipFullDueToPostLaunchProtection` once, when the writer
    /// first runs into the launch window. Every later call is a no-op.
    pub fn flush_buffer(&mut self) -> Result<(), FlashDataSaverError<F::Error>> {
        if self.buffer_len == 0 || self.chip_full_due_to_post_launch_protection {
            return Ok(());
        }
        self.ensure_writable()?;

        if self.post_launch_mode && self.bytes_before_protected_region() < 2 * PAGE_SIZE as u32 {
            log_warn!(
                "Flash full: writer at {:#x} reached protected launch window at {:#x}",
                self.next_write_address,
                self.launch_write_address
            );
            self.chip_full_due_to_post_launch_protection = true;
            return Err(FlashDataSaverError::ChipFullDueToPostLaunchProtection);
        }

        if self.launch_metadata_pending && self.persist_launch_metadata().is_err() {
            log_warn!("Launch metadata still not persisted, retrying on the next page");
        }

        let address = self.next_write_address;
        if address % SECTOR_SIZE == 0 {
            self.erase_sector(address / SECTOR_SIZE)?;
        }
        if let Err(e) = self.flash.write_buffer(address, &self.buffer) {
            log_error!("Flash page write at {:#x} failed", address);
            return Err(FlashDataSaverError::Flash(e));
        }
        self.wait_until_ready()?;

        self.buffer = [ERASED_BYTE; PAGE_SIZE];
        self.buffer_len = 0;
        self.next_write_address = self.wrap(address + PAGE_SIZE as u32);
        Ok(())
    }

    pub fn is_post_launch_mode(&self) -> bool {
        self.post_launch_mode
    }

    /// Drops the launch protection and starts logging from the beginning of
    /// the data region. Only meant to run after the flight data was retrieved.
    pub fn clear_post_launch_mode(&mut self) -> Result<(), FlashDataSaverError<F::Error>> {
        self.erase_sector(METADATA_ADDRESS / SECTOR_SIZE)?;
        self.reset_write_state();
        log_info!("Post-launch mode cleared");
        Ok(())
    }

    pub fn erase_all_data(&mut self) -> Result<(), FlashDataSaverError<F::Error>> {
        if let Err(e) = self.flash.erase_chip() {
            log_error!("Chip erase failed");
            return Err(FlashDataSaverError::Flash(e));
        }
        self.wait_until_ready()?;
        self.reset_write_state();
        log_info!("Flash erased");
        Ok(())
    }

    pub fn last_timestamp_ms(&self) -> Option<u32> {
        self.last_timestamp_ms
    }

    pub fn last_data_point(&self) -> DataPoint {
        self.last_data_point
    }

    pub fn next_write_address(&self) -> u32 {
        self.next_write_address
    }

    pub fn launch_write_address(&self) -> u32 {
        self.launch_write_address
    }

    pub fn is_chip_full_due_to_post_launch_protection(&self) -> bool {
        self.chip_full_due_to_post_launch_protection
    }

    pub fn rebooted_in_post_launch_mode(&self) -> bool {
        self.rebooted_in_post_launch_mode
    }

    /// True while post-launch mode only lives in RAM. A reset in this state
    /// would lose the protection.
    pub fn is_launch_metadata_pending(&self) -> bool {
        self.launch_metadata_pending
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// End of the last whole page of the data region.
    pub(super) fn data_end_address(&self) -> u32 {
        DATA_START_ADDRESS + self.usable_size()
    }

    fn usable_size(&self) -> u32 {
        let data_bytes = self.flash.size().saturating_sub(DATA_START_ADDRESS);
        data_bytes - data_bytes % PAGE_SIZE as u32
    }

    fn wrap(&self, address: u32) -> u32 {
        if address + PAGE_SIZE as u32 > self.data_end_address() {
            DATA_START_ADDRESS
        } else {
            address
        }
    }

    /// Distance the writer can still move forward before reaching the launch address.
    fn bytes_before_protected_region(&self) -> u32 {
        let usable = self.usable_size();
        let next = self.next_write_address - DATA_START_ADDRESS;
        let launch = self.launch_write_address - DATA_START_ADDRESS;
        let travelled = (next + usable - launch) % usable;
        usable - travelled
    }

    fn ensure_writable(&self) -> Result<(), FlashDataSaverError<F::Error>> {
        if self.rebooted_in_post_launch_mode {
            return Err(FlashDataSaverError::RebootedInPostLaunchMode);
        }
        Ok(())
    }

    fn append(&mut self, record: &[u8; RECORD_SIZE]) -> Result<(), FlashDataSaverError<F::Error>> {
        if self.buffer_len + RECORD_SIZE > PAGE_SIZE {
            self.flush_buffer()?;
        }
        self.buffer[self.buffer_len..self.buffer_len + RECORD_SIZE].copy_from_slice(record);
        self.buffer_len += RECORD_SIZE;
        Ok(())
    }

    fn persist_launch_metadata(&mut self) -> Result<(), FlashDataSaverError<F::Error>> {
        self.erase_sector(METADATA_ADDRESS / SECTOR_SIZE)?;
        let metadata = LaunchMetadata::post_launch(self.launch_write_address).pack()?;
        if let Err(e) = self.flash.write_buffer(METADATA_ADDRESS, &metadata) {
            log_error!("Persisting launch metadata failed");
            return Err(FlashDataSaverError::Flash(e));
        }
        self.wait_until_ready()?;
        self.launch_metadata_pending = false;
        Ok(())
    }

    /// Forward time since the last timestamp record. A sample that went back
    /// in time counts as no time elapsed.
    fn timestamp_record_due(&self, timestamp_ms: u32) -> bool {
        let Some(last) = self.last_timestamp_ms else {
            return true;
        };
        let elapsed = timestamp_ms.wrapping_sub(last);
        elapsed <= i32::MAX as u32 && elapsed >= self.config.timestamp_interval_ms as u32
    }

    fn erase_sector(&mut self, sector_index: u32) -> Result<(), FlashDataSaverError<F::Error>> {
        if let Err(e) = self.flash.erase_sector(sector_index) {
            log_error!("Erasing sector {} failed", sector_index);
            return Err(FlashDataSaverError::Flash(e));
        }
        self.wait_until_ready()
    }

    fn wait_until_ready(&mut self) -> Result<(), FlashDataSaverError<F::Error>> {
        wait_until_ready(&mut self.flash, self.config.max_busy_polls)?;
        Ok(())
    }

    fn is_page_erased(&mut self, address: u32) -> Result<bool, FlashDataSaverError<F::Error>> {
        let mut first = [0u8; 1];
        self.flash
            .read_buffer(address, &mut first)
            .map_err(FlashDataSaverError::Flash)?;
        Ok(first[0] == ERASED_BYTE)
    }

    /// First blank page whose sector is blank from there on. Pages are only
    /// ever written whole and start with a record, so the first byte decides.
    fn find_resume_address(&mut self) -> Result<u32, FlashDataSaverError<F::Error>> {
        let end = self.data_end_address();
        let mut address = DATA_START_ADDRESS;
        while address < end {
            if self.is_page_erased(address)? {
                let sector_end = (address / SECTOR_SIZE + 1) * SECTOR_SIZE;
                let mut next_page = address + PAGE_SIZE as u32;
                while next_page < sector_end.min(end) {
                    if !self.is_page_erased(next_page)? {
                        return Ok(self.wrap(sector_end));
                    }
                    next_page += PAGE_SIZE as u32;
                }
                return Ok(address);
            }
            address += PAGE_SIZE as u32;
        }
        Ok(DATA_START_ADDRESS)
    }

    fn reset_write_state(&mut self) {
        self.buffer = [ERASED_BYTE; PAGE_SIZE];
        self.buffer_len = 0;
        self.next_write_address = DATA_START_ADDRESS;
        self.last_timestamp_ms = None;
        self.last_data_point = DataPoint::default();
        self.post_launch_mode = false;
        self.rebooted_in_post_launch_mode = false;
        self.launch_write_address = 0;
        self.chip_full_due_to_post_launch_protection = false;
        self.launch_metadata_pending = false;
    }
}

impl<F: Flash> DataSaver for FlashDataSaver<F> {
    type Error = FlashDataSaverError<F::Error>;

    /// Refuses writes when the metadata says a flight is still on the chip.
    fn begin(&mut self) -> Result<(), Self::Error> {
        self.flash.begin().map_err(FlashDataSaverError::Flash)?;
        if self.flash.size() < DATA_START_ADDRESS + 2 * SECTOR_SIZE {
            return Err(FlashDataSaverError::FlashTooSmall);
        }

        let mut bytes = [0u8; RECORD_SIZE];
        self.flash
            .read_buffer(METADATA_ADDRESS, &mut bytes)
            .map_err(FlashDataSaverError::Flash)?;
        let metadata = LaunchMetadata::unpack(&bytes)?;

        if metadata.is_post_launch() {
            self.post_launch_mode = true;
            self.rebooted_in_post_launch_mode = true;
            self.launch_write_address = metadata.launch_write_address;
            log_warn!(
                "Rebooted in post-launch mode, launch data at {:#x} is protected",
                metadata.launch_write_address
            );
            return Ok(());
        }

        self.next_write_address = self.find_resume_address()?;
        log_info!(
            "Flash log ready, appending at {:#x}",
            self.next_write_address
        );
        Ok(())
    }

    fn save_data_point(&mut self, data_point: DataPoint, name: u8) -> Result<(), Self::Error> {
        if name == ERASED_BYTE || name == DataName::Timestamp.tag() {
            return Err(FlashDataSaverError::ReservedName(name));
        }
        self.ensure_writable()?;
        if self.chip_full_due_to_post_launch_protection {
            return Ok(());
        }

        if self.timestamp_record_due(data_point.timestamp_ms) {
            self.append(&TimestampRecord::new(data_point.timestamp_ms).pack()?)?;
            self.last_timestamp_ms = Some(data_point.timestamp_ms);
        }

        self.append(&DataRecord::new(name, data_point.data).pack()?)?;
        self.last_data_point = data_point;
        Ok(())
    }

    /// Latches post-launch mode and reserves the minute before launch.
    ///
    /// The protection holds in RAM even when persisting it fails. Calling it
    /// again retries the metadata write and is otherwise a no-op.
    fn launch_detected(&mut self, launch_timestamp_ms: u32) -> Result<(), Self::Error> {
        if self.post_launch_mode {
            if self.launch_metadata_pending {
                return self.persist_launch_metadata();
            }
            return Ok(());
        }

        let usable = self.usable_size();
        if usable < 2 * SECTOR_SIZE {
            return Err(FlashDataSaverError::FlashTooSmall);
        }
        let max_rollback = usable.saturating_sub(SECTOR_SIZE + 2 * PAGE_SIZE as u32);
        // at least the two guard pages, so nothing written after launch lands in them
        let rollback = (self.config.data_points_per_minute as u64 * RECORD_SIZE as u64)
            .max(2 * PAGE_SIZE as u64)
            .min(max_rollback as u64) as u32;
        let offset = (self.next_write_address - DATA_START_ADDRESS + usable - rollback) % usable;
        let launch_write_address = DATA_START_ADDRESS + offset - offset % SECTOR_SIZE;

        self.post_launch_mode = true;
        self.launch_write_address = launch_write_address;
        self.launch_metadata_pending = true;
        log_info!(
            "Launch at {}ms, protecting flash from {:#x}",
            launch_timestamp_ms,
            launch_write_address
        );

        self.persist_launch_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_saver::{LogRecord, SimulatedFlash, SimulatedFlashError, decode_page};
    use crate::tests::init_logger;

    const FLASH_SIZE: u32 = 64 * 1024;

    fn saver(config: FlashDataSaverConfig) -> FlashDataSaver<SimulatedFlash> {
        let mut saver = FlashDataSaver::new(SimulatedFlash::new(FLASH_SIZE), config);
        saver.begin().unwrap();
        saver
    }

    fn read_log(flash: &SimulatedFlash) -> Vec<LogRecord> {
        flash.memory()[DATA_START_ADDRESS as usize..]
            .chunks(PAGE_SIZE)
            .take_while(|page| page[0] != ERASED_BYTE)
            .flat_map(decode_page)
            .collect()
    }

    #[test]
    fn timestamp_records_follow_interval() {
        let mut saver = saver(FlashDataSaverConfig {
            timestamp_interval_ms: 100,
            ..Default::default()
        });
        for (t, v) in [(1000, 1.0), (1050, 2.0), (1100, 3.0), (1150, 4.0)] {
            saver.save_data_point(DataPoint::new(t, v), 8).unwrap();
        }
        saver.flush_buffer().unwrap();

        assert_eq!(
            read_log(saver.flash()),
            [
                LogRecord::Timestamp(1000),
                LogRecord::Data { name: 8, value: 1.0 },
                LogRecord::Data { name: 8, value: 2.0 },
                LogRecord::Timestamp(1100),
                LogRecord::Data { name: 8, value: 3.0 },
                LogRecord::Data { name: 8, value: 4.0 },
            ]
        );
        assert_eq!(saver.last_timestamp_ms(), Some(1100));
        assert_eq!(saver.last_data_point().data, 4.0);
    }

    #[test]
    fn pages_fill_without_straddling() {
        let mut saver = saver(FlashDataSaverConfig::default());
        // one timestamp record plus 51 data records is 52 records, more than a page
        for i in 0..51 {
            saver.save_data_point(DataPoint::new(0, i as f32), 1).unwrap();
        }
        assert_eq!(saver.next_write_address(), DATA_START_ADDRESS + PAGE_SIZE as u32);
        assert_eq!(saver.flash().writes(), &[DATA_START_ADDRESS..DATA_START_ADDRESS + 256]);
        assert_eq!(saver.flash().memory()[(DATA_START_ADDRESS + 255) as usize], ERASED_BYTE);

        saver.flush_buffer().unwrap();
        assert_eq!(read_log(saver.flash()).len(), 52);
    }

    #[test]
    fn entering_a_sector_erases_it() {
        let mut flash = SimulatedFlash::new(FLASH_SIZE);
        // stale page left over in sector 1
        flash.write_buffer(DATA_START_ADDRESS + 4 * PAGE_SIZE as u32, &[0x00; 16]).unwrap();
        flash.clear_history();

        let mut saver = FlashDataSaver::new(flash, FlashDataSaverConfig::default());
        saver.begin().unwrap();
        // page 0 of sector 1 is blank but the sector is not, skip to sector 2
        assert_eq!(saver.next_write_address(), 2 * SECTOR_SIZE);

        saver.save_data_point(DataPoint::new(5, 1.0), 1).unwrap();
        saver.flush_buffer().unwrap();
        assert_eq!(saver.flash().erases(), &[2 * SECTOR_SIZE..3 * SECTOR_SIZE]);
    }

    #[test]
    fn wraps_to_start_of_data_region() {
        let mut saver = saver(FlashDataSaverConfig::default());
        let pages = (FLASH_SIZE - DATA_START_ADDRESS) / PAGE_SIZE as u32;
        for _ in 0..pages {
            saver.save_data_point(DataPoint::new(0, 1.0), 1).unwrap();
            saver.flush_buffer().unwrap();
        }
        assert_eq!(saver.next_write_address(), DATA_START_ADDRESS);
        saver.save_data_point(DataPoint::new(0, 2.0), 1).unwrap();
        saver.flush_buffer().unwrap();
        assert_eq!(
            saver.flash().erases().last(),
            Some(&(DATA_START_ADDRESS..DATA_START_ADDRESS + SECTOR_SIZE))
        );
    }

    #[test]
    fn launch_persists_metadata_and_reboot_refuses_writes() {
        init_logger();
        let mut saver = saver(FlashDataSaverConfig {
            data_points_per_minute: 1000,
            ..Default::default()
        });
        for i in 0..3000u32 {
            saver.save_data_point(DataPoint::new(i, i as f32), 1).unwrap();
        }
        let write_address = saver.next_write_address();
        saver.launch_detected(3000).unwrap();
        assert!(saver.is_post_launch_mode());

        // 5000 bytes of rollback, aligned down to a sector
        let expected = write_address - 5000 - (write_address - 5000) % SECTOR_SIZE;
        assert_eq!(saver.launch_write_address(), expected);

        // second call changes nothing
        saver.launch_detected(9999).unwrap();
        assert_eq!(saver.launch_write_address(), expected);

        saver.save_data_point(DataPoint::new(3001, 1.0), 1).unwrap();

        let mut rebooted = FlashDataSaver::new(saver.into_flash(), FlashDataSaverConfig::default());
        rebooted.begin().unwrap();
        assert!(rebooted.rebooted_in_post_launch_mode());
        assert!(rebooted.is_post_launch_mode());
        assert_eq!(rebooted.launch_write_address(), expected);
        assert_eq!(
            rebooted.save_data_point(DataPoint::new(5000, 1.0), 1),
            Err(FlashDataSaverError::RebootedInPostLaunchMode)
        );

        rebooted.clear_post_launch_mode().unwrap();
        assert!(!rebooted.is_post_launch_mode());
        assert_eq!(rebooted.next_write_address(), DATA_START_ADDRESS);
        rebooted.save_data_point(DataPoint::new(5000, 1.0), 1).unwrap();
    }

    #[test]
    fn rollback_before_first_wrap_lands_in_data_region() {
        let mut saver = saver(FlashDataSaverConfig::default());
        saver.save_data_point(DataPoint::new(0, 1.0), 1).unwrap();
        saver.launch_detected(0).unwrap();

        let launch = saver.launch_write_address();
        assert!(launch >= DATA_START_ADDRESS && launch < FLASH_SIZE);
        assert_eq!(launch % SECTOR_SIZE, 0);
    }

    #[test]
    fn write_failure_is_reported() {
        let mut saver = saver(FlashDataSaverConfig::default());
        saver.save_data_point(DataPoint::new(0, 1.0), 1).unwrap();
        saver.flash.set_fail_writes(true);
        assert!(matches!(
            saver.flush_buffer(),
            Err(FlashDataSaverError::Flash(_))
        ));
        // nothing was lost from the buffer
        saver.flash.set_fail_writes(false);
        saver.flush_buffer().unwrap();
        assert_eq!(read_log(saver.flash()).len(), 2);
    }

    #[test]
    fn erase_all_data_resets_everything() {
        let mut saver = saver(FlashDataSaverConfig::default());
        saver.save_data_point(DataPoint::new(0, 1.0), 1).unwrap();
        saver.flush_buffer().unwrap();
        saver.launch_detected(0).unwrap();

        saver.erase_all_data().unwrap();
        assert!(!saver.is_post_launch_mode());
        assert_eq!(saver.last_timestamp_ms(), None);
        assert!(saver.flash().memory().iter().all(|b| *b == ERASED_BYTE));
    }

    #[test]
    fn tiny_flash_is_rejected() {
        let mut saver = FlashDataSaver::new(SimulatedFlash::new(8192), FlashDataSaverConfig::default());
        assert_eq!(saver.begin(), Err(FlashDataSaverError::FlashTooSmall));
    }

    #[test]
    fn busy_timeout_surfaces() {
        let flash = SimulatedFlash::new(FLASH_SIZE).with_busy_polls(100);
        let mut saver = FlashDataSaver::new(
            flash,
            FlashDataSaverConfig {
                max_busy_polls: 10,
                ..Default::default()
            },
        );
        saver.begin().unwrap();
        saver.save_data_point(DataPoint::new(0, 1.0), 1).unwrap();
        assert_eq!(saver.flush_buffer(), Err(FlashDataSaverError::BusyTimeout));
    }

    fn launched_after_failed_metadata_write() -> FlashDataSaver<SimulatedFlash> {
        let mut saver = saver(FlashDataSaverConfig::default());
        for i in 0..500u32 {
            saver.save_data_point(DataPoint::new(i, i as f32), 1).unwrap();
        }
        saver.flash.set_fail_writes(true);
        assert_eq!(
            saver.launch_detected(500),
            Err(FlashDataSaverError::Flash(SimulatedFlashError::InjectedFailure))
        );
        saver.flash.set_fail_writes(false);
        saver
    }

    #[test]
    fn failed_launch_metadata_write_keeps_protection_and_retries() {
        init_logger();
        let mut saver = launched_after_failed_metadata_write();
        assert!(saver.is_post_launch_mode());
        assert!(saver.is_launch_metadata_pending());
        let launch = saver.launch_write_address();

        saver.launch_detected(600).unwrap();
        assert!(!saver.is_launch_metadata_pending());
        assert_eq!(saver.launch_write_address(), launch);

        let mut rebooted = FlashDataSaver::new(saver.into_flash(), FlashDataSaverConfig::default());
        rebooted.begin().unwrap();
        assert!(rebooted.rebooted_in_post_launch_mode());
        assert_eq!(rebooted.launch_write_address(), launch);
    }

    #[test]
    fn page_flush_retries_pending_launch_metadata() {
        let mut saver = launched_after_failed_metadata_write();
        let launch = saver.launch_write_address();

        saver.save_data_point(DataPoint::new(501, 1.0), 1).unwrap();
        saver.flush_buffer().unwrap();
        assert!(!saver.is_launch_metadata_pending());

        let mut rebooted = FlashDataSaver::new(saver.into_flash(), FlashDataSaverConfig::default());
        rebooted.begin().unwrap();
        assert!(rebooted.rebooted_in_post_launch_mode());
        assert_eq!(rebooted.launch_write_address(), launch);
    }

    #[test]
    fn reserved_names_are_rejected() {
        let mut saver = saver(FlashDataSaverConfig::default());
        assert_eq!(
            saver.save_data_point(DataPoint::new(0, 1.0), ERASED_BYTE),
            Err(FlashDataSaverError::ReservedName(ERASED_BYTE))
        );
        for i in 0..10 {
            saver.save_data_point(DataPoint::new(0, i as f32), 1).unwrap();
        }
        assert_eq!(
            saver.save_data_point(DataPoint::new(0, 1.0), DataName::Timestamp.tag()),
            Err(FlashDataSaverError::ReservedName(14))
        );
        saver.flush_buffer().unwrap();

        let log = read_log(saver.flash());
        assert_eq!(log.len(), 11);
        assert_eq!(log[0], LogRecord::Timestamp(0));
        assert_eq!(log[10], LogRecord::Data { name: 1, value: 9.0 });
    }

    #[test]
    fn backwards_timestamp_adds_no_timestamp_record() {
        let mut saver = saver(FlashDataSaverConfig {
            timestamp_interval_ms: 100,
            ..Default::default()
        });
        saver.save_data_point(DataPoint::new(1000, 1.0), 8).unwrap();
        saver.save_data_point(DataPoint::new(999, 2.0), 8).unwrap();
        saver.save_data_point(DataPoint::new(10, 3.0), 8).unwrap();
        assert_eq!(saver.last_timestamp_ms(), Some(1000));

        saver.save_data_point(DataPoint::new(1100, 4.0), 8).unwrap();
        saver.flush_buffer().unwrap();
        assert_eq!(
            read_log(saver.flash()),
            [
                LogRecord::Timestamp(1000),
                LogRecord::Data { name: 8, value: 1.0 },
                LogRecord::Data { name: 8, value: 2.0 },
                LogRecord::Data { name: 8, value: 3.0 },
                LogRecord::Timestamp(1100),
                LogRecord::Data { name: 8, value: 4.0 },
            ]
        );
    }

    #[test]
    fn timestamp_record_written_across_u32_wrap() {
        let mut saver = saver(FlashDataSaverConfig {
            timestamp_interval_ms: 100,
            ..Default::default()
        });
        saver.save_data_point(DataPoint::new(u32::MAX - 50, 1.0), 8).unwrap();
        saver.save_data_point(DataPoint::new(60, 2.0), 8).unwrap();
        assert_eq!(saver.last_timestamp_ms(), Some(60));
    }
}
