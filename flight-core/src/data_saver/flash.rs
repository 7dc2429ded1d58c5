use core::fmt::Debug;

/// Upper bound on status polls after an erase or write before giving up.
pub const MAX_BUSY_POLLS: u32 = 1_000_000;

/// Raw NOR flash, addressed in bytes from 0 to `size()`.
///
/// Writes can only clear bits, a sector must be erased (all `0xFF`) before
/// it is written again. Every call blocks until the chip accepted the command.
pub trait Flash {
    type Error: Debug;

    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn size(&self) -> u32;

    fn read_buffer(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), Self::Error>;

    fn write_buffer(&mut self, address: u32, buffer: &[u8]) -> Result<(), Self::Error>;

    fn erase_sector(&mut self, sector_index: u32) -> Result<(), Self::Error>;

    fn erase_chip(&mut self) -> Result<(), Self::Error>;

    /// Write-in-progress status bit.
    fn is_busy(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashWaitError<E> {
    Flash(E),
    BusyTimeout,
}

/// Polls `is_busy` at most `max_polls` times.
pub fn wait_until_ready<F: Flash>(flash: &mut F, max_polls: u32) -> Result<(), FlashWaitError<F::Error>> {
    for _ in 0..max_polls {
        if !flash.is_busy().map_err(FlashWaitError::Flash)? {
            return Ok(());
        }
    }
    Err(FlashWaitError::BusyTimeout)
}
