//! MAX6675 K-type thermocouple converter on SPI.
//!
//! Each read clocks out one 16-bit frame, MSB first:
//!
//! ```text
//!  D15    D14 ........ D3   D2     D1   D0
//!  dummy  temperature(12)  OPEN   id   tri-state
//! ```
//!
//! Temperature LSB is 0.25 °C.  D2 set means the thermocouple input is
//! open (sensor unplugged), reported as [`SensorError::NotConnected`].
//! The chip needs ~220 ms per conversion; faster reads return the
//! previous sample.

use embedded_hal::spi::SpiDevice;
use log::warn;

use crate::app::ports::TemperatureSource;
use crate::error::SensorError;

const OPEN_BIT: u16 = 1 << 2;
const LSB_C: f32 = 0.25;

pub struct Max6675<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Max6675<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Raw 16-bit frame.
    pub fn read_frame(&mut self) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.spi.read(&mut buf).map_err(|_| {
            warn!("MAX6675: SPI transfer failed");
            SensorError::Bus
        })?;
        Ok(u16::from_be_bytes(buf))
    }
}

/// Decode a MAX6675 frame to °C.
pub fn decode_frame(frame: u16) -> Result<f32, SensorError> {
    if frame & OPEN_BIT != 0 {
        return Err(SensorError::NotConnected);
    }
    Ok(f32::from((frame >> 3) & 0x0FFF) * LSB_C)
}

impl<SPI: SpiDevice> TemperatureSource for Max6675<SPI> {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        decode_frame(self.read_frame()?)
    }
}
