//! Sideband register writes over SPI.
//!
//! Devices under evaluation expose a register map behind a 16-bit SPI
//! frame: write flag plus 7-bit address in the first byte, data in the
//! second. The timing core issues one byte per call; the two-byte split
//! (low byte, stall, high byte) happens a layer above.

use embedded_hal::blocking::spi::Write;
use pulsebridge_common::busy::TriggerBus;
use pulsebridge_common::status::Status;

/// Write flag in the address byte of a register frame.
const WRITE_FLAG: u8 = 0x80;

pub struct SpiTriggerBus<SPI> {
    spi: SPI,
}

impl<SPI> SpiTriggerBus<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }
}

impl<SPI: Write<u8>> TriggerBus for SpiTriggerBus<SPI> {
    fn write_register(&mut self, addr: u16, value: u8) -> Result<(), Status> {
        let frame = [(addr as u8) | WRITE_FLAG, value];
        self.spi.write(&frame).map_err(|_| Status::ConfigFailed)
    }
}
