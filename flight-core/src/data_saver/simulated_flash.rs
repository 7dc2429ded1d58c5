use std::ops::Range;

use super::Flash;

pub const SIMULATED_FLASH_SECTOR_SIZE: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedFlashError {
    OutOfBounds { address: u32, len: usize },
    InjectedFailure,
}

/// In-memory NOR flash.
///
/// Erased bytes read `0xFF` and a write ANDs into the existing contents, so
/// writing twice without an erase corrupts data just like the real part.
/// Every write and erase is recorded for inspection.
#[derive(Debug, Clone)]
pub struct SimulatedFlash {
    memory: Vec<u8>,
    writes: Vec<Range<u32>>,
    erases: Vec<Range<u32>>,
    busy_polls_per_operation: u32,
    busy_polls_left: u32,
    fail_writes: bool,
}

impl SimulatedFlash {
    /// `size` is rounded up to whole sectors.
    pub fn new(size: u32) -> Self {
        let sectors = size.div_ceil(SIMULATED_FLASH_SECTOR_SIZE).max(1);
        Self {
            memory: vec![0xFF; (sectors * SIMULATED_FLASH_SECTOR_SIZE) as usize],
            writes: Vec::new(),
            erases: Vec::new(),
            busy_polls_per_operation: 0,
            busy_polls_left: 0,
            fail_writes: false,
        }
    }

    /// Report busy for `polls` status reads after each write or erase.
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls_per_operation = polls;
        self
    }

    pub fn set_fail_writes(&mut self, fail_writes: bool) {
        self.fail_writes = fail_writes;
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn writes(&self) -> &[Range<u32>] {
        &self.writes
    }

    pub fn erases(&self) -> &[Range<u32>] {
        &self.erases
    }

    pub fn clear_history(&mut self) {
        self.writes.clear();
        self.erases.clear();
    }

    fn range(&self, address: u32, len: usize) -> Result<Range<usize>, SimulatedFlashError> {
        let start = address as usize;
        let end = start + len;
        if end > self.memory.len() {
            return Err(SimulatedFlashError::OutOfBounds { address, len });
        }
        Ok(start..end)
    }
}

impl Flash for SimulatedFlash {
    type Error = SimulatedFlashError;

    fn size(&self) -> u32 {
        self.memory.len() as u32
    }

    fn read_buffer(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(address, buffer.len())?;
        buffer.copy_from_slice(&self.memory[range]);
        Ok(())
    }

    fn write_buffer(&mut self, address: u32, buffer: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(SimulatedFlashError::InjectedFailure);
        }
        let range = self.range(address, buffer.len())?;
        for (cell, byte) in self.memory[range].iter_mut().zip(buffer) {
            *cell &= *byte;
        }
        self.writes.push(address..address + buffer.len() as u32);
        self.busy_polls_left = self.busy_polls_per_operation;
        Ok(())
    }

    fn erase_sector(&mut self, sector_index: u32) -> Result<(), Self::Error> {
        let address = sector_index * SIMULATED_FLASH_SECTOR_SIZE;
        let range = self.range(address, SIMULATED_FLASH_SECTOR_SIZE as usize)?;
        self.memory[range].fill(0xFF);
        self.erases
            .push(address..address + SIMULATED_FLASH_SECTOR_SIZE);
        self.busy_polls_left = self.busy_polls_per_operation;
        Ok(())
    }

    fn erase_chip(&mut self) -> Result<(), Self::Error> {
        self.memory.fill(0xFF);
        self.erases.push(0..self.memory.len() as u32);
        self.busy_polls_left = self.busy_polls_per_operation;
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, Self::Error> {
        if self.busy_polls_left > 0 {
            self.busy_polls_left -= 1;
            return Ok(true);
        }
        Ok(false)
    }
}
