//! Pulse generation.

use crate::gpio::{self, GpioBridge};
use crate::status::Status;
use crate::timer::{RolloverTracker, TickTimer};

/// Drive `pin` at `polarity` for an absolute duration expressed as a
/// (tick, rollover) pair.
///
/// Both bounds must be met before the drive ends (AND semantics), which
/// keeps multi-wrap durations exact. Afterwards the pin is driven to the
/// opposite polarity and handed back as a high-impedance input, whatever
/// the intermediate outcome.
pub fn drive_pulse(
    gpio: &mut impl GpioBridge,
    timer: &mut impl TickTimer,
    pin: u16,
    polarity: bool,
    duration_ticks: u32,
    duration_rollovers: u32,
) -> Result<(), Status> {
    gpio::force_output(gpio, pin, polarity)?;
    timer.reset();

    let mut elapsed = RolloverTracker::new();
    loop {
        elapsed.record(timer.sample_now());
        if elapsed.ticks() >= duration_ticks && elapsed.rollovers() >= duration_rollovers {
            break;
        }
    }

    // End the pulse, then restore the safe input configuration.
    let drive_end = gpio.write_level(pin, !polarity);
    let _ = gpio.release(pin);
    let restore = gpio.configure_input(pin);
    drive_end.and(restore)
}

/// Enable or disable hardware periodic-waveform output on `pin`.
///
/// Enabling reassigns the pin from simple GPIO to the hardware waveform
/// unit; disabling reverts it to a plain input. A pin that cannot be
/// detached from its current mode fails distinguishably.
pub fn configure_periodic(
    gpio: &mut impl GpioBridge,
    pin: u16,
    enable: bool,
    period: u32,
    threshold: u32,
) -> Result<(), Status> {
    // The pin may currently be owned by another mode; the detach has to
    // succeed before anything else happens.
    gpio.release(pin)?;
    if enable {
        gpio.configure_waveform(pin, period, threshold)
    } else {
        gpio.configure_input(pin)
    }
}
