use embedded_io::{Read, ReadReady, Write};

use super::flash::Flash;
use super::flash_saver::{DATA_START_ADDRESS, FlashDataSaver, PAGE_SIZE};
use super::records::ERASED_BYTE;
use crate::time::Clock;

/// Sent once before the first page.
pub const DUMP_SYNC: [u8; 4] = [0xAA, 0x55, 0xAA, 0x55];
/// Precedes every page: tag, u32 LE address, then `PAGE_SIZE` raw bytes.
pub const PAGE_TAG: u8 = b'P';
/// Closes the dump: tag, then the `DumpStatus` byte.
pub const END_TAG: u8 = b'E';
/// The host sends this after every page it received.
pub const ACK: u8 = 0x06;
pub const DUMP_ACK_TIMEOUT_MS: u32 = 10_000;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DumpStatus {
    Complete = 0,
    TimedOut = 1,
    Error = 2,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpReport {
    pub pages_sent: u32,
    pub status: DumpStatus,
}

impl DumpReport {
    pub fn timed_out(&self) -> bool {
        self.status == DumpStatus::TimedOut
    }
}

enum AckError {
    TimedOut,
    Stream,
}

fn wait_for_ack<S, C>(stream: &mut S, clock: &C) -> Result<(), AckError>
where
    S: Read + ReadReady,
    C: Clock,
{
    let start = clock.now_ms();
    loop {
        if stream.read_ready().map_err(|_| AckError::Stream)? {
            let mut byte = [0u8; 1];
            let read = stream.read(&mut byte).map_err(|_| AckError::Stream)?;
            if read == 1 && byte[0] == ACK {
                return Ok(());
            }
        }
        if clock.now_ms().wrapping_sub(start) >= DUMP_ACK_TIMEOUT_MS {
            return Err(AckError::TimedOut);
        }
    }
}

impl<F: Flash> FlashDataSaver<F> {
    /// Streams every written page of the data region to a host.
    ///
    /// Pages go out in address order starting at `DATA_START_ADDRESS` and the
    /// scan stops at the first blank page. Each page must be acknowledged
    /// within `DUMP_ACK_TIMEOUT_MS`. The page buffer is not flushed, call
    /// `flush_buffer` first to include it.
    pub fn dump_data<S, C>(&mut self, stream: &mut S, clock: &C) -> DumpReport
    where
        S: Read + ReadReady + Write,
        C: Clock,
    {
        let mut pages_sent = 0;
        let status = self.send_pages(stream, clock, &mut pages_sent);

        if stream
            .write_all(&[END_TAG, status as u8])
            .and_then(|_| stream.flush())
            .is_err()
        {
            log_warn!("Could not send end of dump");
        }

        match status {
            DumpStatus::Complete => log_info!("Dump complete, {} pages", pages_sent),
            DumpStatus::TimedOut => log_warn!("Dump timed out after {} pages", pages_sent),
            DumpStatus::Error => log_error!("Dump failed after {} pages", pages_sent),
        }
        DumpReport { pages_sent, status }
    }

    fn send_pages<S, C>(&mut self, stream: &mut S, clock: &C, pages_sent: &mut u32) -> DumpStatus
    where
        S: Read + ReadReady + Write,
        C: Clock,
    {
        if stream.write_all(&DUMP_SYNC).is_err() {
            return DumpStatus::Error;
        }

        let end = self.data_end_address();
        let mut page = [0u8; PAGE_SIZE];
        let mut address = DATA_START_ADDRESS;
        while address < end {
            if self.flash_mut().read_buffer(address, &mut page).is_err() {
                return DumpStatus::Error;
            }
            if page[0] == ERASED_BYTE {
                break;
            }

            let mut header = [PAGE_TAG; 5];
            header[1..].copy_from_slice(&address.to_le_bytes());
            let sent = stream
                .write_all(&header)
                .and_then(|_| stream.write_all(&page))
                .and_then(|_| stream.flush());
            if sent.is_err() {
                return DumpStatus::Error;
            }

            match wait_for_ack(stream, clock) {
                Ok(()) => *pages_sent += 1,
                Err(AckError::TimedOut) => return DumpStatus::TimedOut,
                Err(AckError::Stream) => return DumpStatus::Error,
            }
            address += PAGE_SIZE as u32;
        }
        DumpStatus::Complete
    }
}
