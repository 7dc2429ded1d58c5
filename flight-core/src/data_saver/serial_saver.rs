use embedded_io::Write;
use packed_struct::prelude::*;

use super::DataSaver;
use crate::data_point::DataPoint;

/// Packed frame plus `SERIAL_FRAME_TERMINATOR`.
pub const SERIAL_FRAME_SIZE: usize = 12;
pub const SERIAL_FRAME_TERMINATOR: [u8; 3] = [0x00, b'\r', b'\n'];

#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "lsb")]
pub struct SerialFrame {
    pub timestamp_ms: u32,
    value_bits: u32,
    pub name: u8,
}

impl SerialFrame {
    pub fn new(data_point: DataPoint, name: u8) -> Self {
        Self {
            timestamp_ms: data_point.timestamp_ms,
            value_bits: data_point.data.to_bits(),
            name,
        }
    }

    pub fn value(&self) -> f32 {
        f32::from_bits(self.value_bits)
    }

    pub fn to_bytes(&self) -> Result<[u8; SERIAL_FRAME_SIZE], PackingError> {
        let mut bytes = [0u8; SERIAL_FRAME_SIZE];
        bytes[..9].copy_from_slice(&self.pack()?);
        bytes[9..].copy_from_slice(&SERIAL_FRAME_TERMINATOR);
        Ok(bytes)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialDataSaverError<E> {
    Write(E),
    Packing,
}

/// Streams every data point to a serial link for live telemetry.
#[derive(Debug)]
pub struct SerialDataSaver<W: Write> {
    writer: W,
}

impl<W: Write> SerialDataSaver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: Write> DataSaver for SerialDataSaver<W> {
    type Error = SerialDataSaverError<W::Error>;

    fn save_data_point(&mut self, data_point: DataPoint, name: u8) -> Result<(), Self::Error> {
        let bytes = SerialFrame::new(data_point, name)
            .to_bytes()
            .map_err(|_| SerialDataSaverError::Packing)?;
        self.writer
            .write_all(&bytes)
            .map_err(SerialDataSaverError::Write)
    }
}
