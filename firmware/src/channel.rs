//! Framed result transport over the host serial link.
//!
//! Both directions use the same minimal framing: one length byte followed
//! by that many payload bytes. Request frames carry a command byte plus
//! the operation's parameter buffer; reply frames carry one encoded result
//! record.

use embedded_hal::serial::{Read, Write};
use nb::block;

pub const MAX_FRAME_LEN: usize = 64;

pub struct HostLink<S> {
    serial: S,
}

impl<S> HostLink<S>
where
    S: Read<u8> + Write<u8>,
{
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    /// Block until a complete frame has arrived and return its payload.
    ///
    /// Receive errors (framing, overrun) drop the byte and keep reading;
    /// the host re-issues a request that gets no reply.
    pub fn read_frame<'a>(&mut self, buf: &'a mut [u8; MAX_FRAME_LEN]) -> &'a [u8] {
        let len = loop {
            match self.read_byte() {
                len if (len as usize) <= MAX_FRAME_LEN => break len as usize,
                // Oversized length byte: out of sync, wait for the next one.
                _ => continue,
            }
        };
        for slot in buf[..len].iter_mut() {
            *slot = self.read_byte();
        }
        &buf[..len]
    }

    /// Ship one reply frame. Transmit errors are not recoverable at this
    /// layer and are dropped; the host times out and retries.
    pub fn write_frame(&mut self, payload: &[u8]) {
        debug_assert!(payload.len() <= MAX_FRAME_LEN);
        let _ = block!(self.serial.write(payload.len() as u8));
        for byte in payload {
            let _ = block!(self.serial.write(*byte));
        }
        let _ = block!(self.serial.flush());
    }

    fn read_byte(&mut self) -> u8 {
        loop {
            match block!(self.serial.read()) {
                Ok(byte) => return byte,
                Err(_) => continue,
            }
        }
    }
}
