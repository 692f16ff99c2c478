//! Triggered busy-pulse measurement.
//!
//! Issues a user-selected trigger, waits for a dependent "busy" pin to
//! assert, then measures how long the device holds it.

use crate::gpio::{self, GpioBridge};
use crate::status::Status;
use crate::timer::{stall_us, RolloverTracker, TickTimer, TimerConfig, Timeout};
use crate::INVALID_PIN_ELAPSED;

/// Fixed forward correction for measurement latency, in ticks. Calibrated
/// with a logic analyzer.
const LATENCY_CORRECTION_TICKS: u32 = 20;

/// How the measured pulse is kicked off.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriggerSpec {
    /// Two-phase register write over the sideband bus: the low value byte
    /// goes to `addr`, then after a calibrated stall the high byte goes to
    /// `addr + 1`. The stall gives the device time to settle between the
    /// two bytes.
    Register { addr: u16, value: u16, stall_us: u32 },
    /// Drive `pin` at `polarity` for `drive_ticks`.
    Pin {
        pin: u16,
        polarity: bool,
        drive_ticks: u32,
    },
}

/// Sideband register-write capability used by [`TriggerSpec::Register`].
pub trait TriggerBus {
    fn write_register(&mut self, addr: u16, value: u8) -> Result<(), Status>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusyPulseOutcome {
    pub status: Status,
    pub elapsed_ticks: u32,
    pub rollovers: u32,
}

impl BusyPulseOutcome {
    fn failed(status: Status) -> Self {
        Self {
            status,
            elapsed_ticks: INVALID_PIN_ELAPSED,
            rollovers: 0,
        }
    }
}

/// Trigger a device operation and measure the resulting busy pulse.
///
/// After the trigger the busy pin is first awaited at `busy_polarity`
/// (untimed: this is the "device starts responding" phase), then the
/// measurement runs until the pin leaves that level or the timeout expires
/// (OR semantics). The final elapsed value carries a fixed +20 tick
/// latency correction; if that would overflow 32 bits, the rollover count
/// is bumped instead.
pub fn measure_busy_pulse(
    gpio: &mut impl GpioBridge,
    timer: &mut impl TickTimer,
    bus: &mut impl TriggerBus,
    config: &TimerConfig,
    busy_pin: u16,
    busy_polarity: bool,
    timeout: Timeout,
    trigger: TriggerSpec,
) -> BusyPulseOutcome {
    // The busy pin has to be usable before any trigger is issued.
    if gpio::ensure_input(gpio, busy_pin).is_err() {
        return BusyPulseOutcome::failed(Status::InvalidPin);
    }

    let mut trigger_pin = None;
    let mut trigger_start = 0;

    match trigger {
        TriggerSpec::Register {
            addr,
            value,
            stall_us: stall,
        } => {
            if let Err(status) = issue_register_trigger(bus, timer, config, addr, value, stall) {
                return BusyPulseOutcome::failed(status);
            }
        }
        TriggerSpec::Pin {
            pin,
            polarity,
            drive_ticks,
        } => {
            // The trigger pin may be parked in waveform mode; override it
            // out before reconfiguring as a driven output.
            if let Err(status) = gpio.release(pin) {
                return BusyPulseOutcome::failed(status);
            }
            if let Err(status) = gpio.configure_output(pin, polarity) {
                return BusyPulseOutcome::failed(status);
            }
            trigger_pin = Some((pin, polarity, drive_ticks));
            trigger_start = timer.sample_now();
        }
    }

    let mut status = Status::Success;
    let mut elapsed_ticks = INVALID_PIN_ELAPSED;
    let mut rollovers = 0;

    // Wait for the device to begin responding. Deliberately untimed. A
    // read failure here skips the measurement but still falls through to
    // the trigger-pin restore below.
    loop {
        match gpio.read_level(busy_pin) {
            Ok(level) if level == busy_polarity => break,
            Ok(_) => {}
            Err(read_status) => {
                status = read_status;
                break;
            }
        }
    }

    if status.is_success() {
        // Pin triggers fold the assert-wait into the drive budget: when
        // the wait already exceeded the requested drive time, the pulse
        // ends here.
        if let Some((pin, polarity, drive_ticks)) = trigger_pin {
            let waited = timer.sample_now().wrapping_sub(trigger_start);
            if waited > drive_ticks {
                let _ = gpio.write_level(pin, !polarity);
            }
        }

        timer.reset();
        let mut elapsed = RolloverTracker::new();
        loop {
            elapsed.record(timer.sample_now());
            match gpio.read_level(busy_pin) {
                Ok(level) if level != busy_polarity => break,
                Ok(_) => {}
                Err(read_status) => {
                    status = read_status;
                    break;
                }
            }
            if timeout.expired(&elapsed) {
                break;
            }
        }

        elapsed_ticks = elapsed.ticks();
        rollovers = elapsed.rollovers();
        if elapsed_ticks < u32::MAX - LATENCY_CORRECTION_TICKS {
            elapsed_ticks += LATENCY_CORRECTION_TICKS;
        } else {
            elapsed_ticks = 0;
            rollovers += 1;
        }
    }

    // Hand the trigger pin back as a safe input, whatever happened above.
    if let Some((pin, _, _)) = trigger_pin {
        let _ = gpio.release(pin);
        if let Err(restore_status) = gpio.configure_input(pin) {
            status = restore_status;
        }
    }

    BusyPulseOutcome {
        status,
        elapsed_ticks,
        rollovers,
    }
}

fn issue_register_trigger(
    bus: &mut impl TriggerBus,
    timer: &mut impl TickTimer,
    config: &TimerConfig,
    addr: u16,
    value: u16,
    stall: u32,
) -> Result<(), Status> {
    bus.write_register(addr, (value & 0xFF) as u8)?;
    stall_us(timer, config, stall)?;
    bus.write_register(addr.wrapping_add(1), (value >> 8) as u8)
}
