use packed_struct::prelude::*;

use crate::data_point::{DataName, DataPoint};

/// Every record on flash is 5 bytes, a name tag followed by a 32 bit payload.
pub const RECORD_SIZE: usize = 5;
/// Unwritten flash, never a valid name tag.
pub const ERASED_BYTE: u8 = 0xFF;
pub const POST_LAUNCH_FLAG_SET: u8 = 0x01;

#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "lsb")]
pub struct TimestampRecord {
    name: u8,
    pub timestamp_ms: u32,
}

impl TimestampRecord {
    pub fn new(timestamp_ms: u32) -> Self {
        Self {
            name: DataName::Timestamp.tag(),
            timestamp_ms,
        }
    }
}

#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "lsb")]
pub struct DataRecord {
    pub name: u8,
    value_bits: u32,
}

impl DataRecord {
    pub fn new(name: u8, value: f32) -> Self {
        Self {
            name,
            value_bits: value.to_bits(),
        }
    }

    pub fn value(&self) -> f32 {
        f32::from_bits(self.value_bits)
    }
}

/// Stored at the start of sector 0.
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "lsb")]
pub struct LaunchMetadata {
    flag: u8,
    pub launch_write_address: u32,
}

impl LaunchMetadata {
    pub fn post_launch(launch_write_address: u32) -> Self {
        Self {
            flag: POST_LAUNCH_FLAG_SET,
            launch_write_address,
        }
    }

    /// Erased (`0xFF`) and zeroed flags both read as "not launched".
    pub fn is_post_launch(&self) -> bool {
        self.flag == POST_LAUNCH_FLAG_SET
    }
}

/// One decoded entry of the flash log.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogRecord {
    Timestamp(u32),
    Data { name: u8, value: f32 },
}

impl LogRecord {
    fn unpack_record(bytes: &[u8; RECORD_SIZE]) -> Option<Self> {
        if bytes[0] == DataName::Timestamp.tag() {
            let record = TimestampRecord::unpack(bytes).ok()?;
            Some(Self::Timestamp(record.timestamp_ms))
        } else {
            let record = DataRecord::unpack(bytes).ok()?;
            Some(Self::Data {
                name: record.name,
                value: record.value(),
            })
        }
    }

    /// Attaches the most recent timestamp record to a data record.
    pub fn with_timestamp(&self, last_timestamp_ms: u32) -> Option<(DataPoint, u8)> {
        match *self {
            Self::Timestamp(_) => None,
            Self::Data { name, value } => Some((DataPoint::new(last_timestamp_ms, value), name)),
        }
    }
}

/// Records packed into one flash page, stopping at the first erased slot.
/// Records never straddle a page, so a short tail is padding.
pub fn decode_page(page: &[u8]) -> impl Iterator<Item = LogRecord> + '_ {
    page.chunks_exact(RECORD_SIZE)
        .take_while(|chunk| chunk[0] != ERASED_BYTE)
        .filter_map(|chunk| {
            <&[u8; RECORD_SIZE]>::try_from(chunk)
                .ok()
                .and_then(LogRecord::unpack_record)
        })
}
