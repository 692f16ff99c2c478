//! Logical pin access.
//!
//! The register-level GPIO driver is consumed as a capability; operations
//! in this crate never touch port registers directly. Any configuration
//! call may fail (pin reserved, index invalid, hardware busy), so callers
//! go through the recovery helpers below instead of assuming success.

use crate::status::Status;

pub trait GpioBridge {
    /// Configure `pin` as a high-impedance input.
    fn configure_input(&mut self, pin: u16) -> Result<(), Status>;

    /// Configure `pin` as a driven output at `level`.
    fn configure_output(&mut self, pin: u16, level: bool) -> Result<(), Status>;

    /// Read the current logic level of `pin`.
    fn read_level(&mut self, pin: u16) -> Result<bool, Status>;

    /// Drive a previously configured output to `level`.
    fn write_level(&mut self, pin: u16, level: bool) -> Result<(), Status>;

    /// Override `pin` out of whatever mode currently owns it (hardware
    /// waveform output included) and disable it. This is the strong
    /// recovery step taken before a reconfiguration retry.
    fn release(&mut self, pin: u16) -> Result<(), Status>;

    /// Reassign `pin` to hardware periodic-waveform mode with the given
    /// period and threshold (duty ratio = threshold / period), clocked in
    /// high-frequency timer mode.
    fn configure_waveform(&mut self, pin: u16, period: u32, threshold: u32) -> Result<(), Status>;
}

/// Make sure `pin` can act as an input and return its current level.
///
/// A failed initial read triggers one reconfiguration attempt; only the
/// second read decides whether the pin is usable.
pub fn ensure_input(gpio: &mut impl GpioBridge, pin: u16) -> Result<bool, Status> {
    match gpio.read_level(pin) {
        Ok(level) => Ok(level),
        Err(_) => {
            // The configuration itself may report failure while the pin
            // still ends up readable; trust the re-read.
            let _ = gpio.configure_input(pin);
            gpio.read_level(pin)
        }
    }
}

/// Configure `pin` as a driven output at `level`, retrying once through the
/// override-disable-reconfigure path before giving up.
pub fn force_output(gpio: &mut impl GpioBridge, pin: u16, level: bool) -> Result<(), Status> {
    if gpio.configure_output(pin, level).is_ok() {
        return Ok(());
    }
    let _ = gpio.release(pin);
    gpio.configure_output(pin, level)
}
