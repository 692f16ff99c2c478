//! Blocking pulse waits.

use crate::gpio::{self, GpioBridge};
use crate::status::Status;
use crate::timer::{RolloverTracker, TickTimer, Timeout};
use crate::INVALID_PIN_ELAPSED;

/// Outcome of [`wait_for_level`].
///
/// The elapsed pair is reported whether the level was reached or the
/// timeout won; callers that need to distinguish the two re-check the pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WaitOutcome {
    pub status: Status,
    pub elapsed_ticks: u32,
    pub rollovers: u32,
}

/// Busy-poll until `pin` reads `polarity` or the timeout expires, whichever
/// comes first (OR semantics, unlike the drive-duration bound in
/// [`crate::pulse::drive_pulse`]).
///
/// An optional initial delay of `delay_ticks` runs before polling starts;
/// no timeout applies to that phase. A pin that cannot act as an input
/// short-circuits to the 0xFFFF_FFFF sentinel without waiting.
pub fn wait_for_level(
    gpio: &mut impl GpioBridge,
    timer: &mut impl TickTimer,
    pin: u16,
    polarity: bool,
    delay_ticks: u32,
    timeout: Timeout,
) -> WaitOutcome {
    timer.reset();

    if gpio::ensure_input(gpio, pin).is_err() {
        return WaitOutcome {
            status: Status::InvalidPin,
            elapsed_ticks: INVALID_PIN_ELAPSED,
            rollovers: 0,
        };
    }

    // Settling delay; deliberately untimed.
    if delay_ticks > 0 {
        while timer.sample_now() < delay_ticks {}
    }

    let mut elapsed = RolloverTracker::new();
    loop {
        elapsed.record(timer.sample_now());
        match gpio.read_level(pin) {
            Ok(level) if level == polarity => break,
            Ok(_) => {}
            Err(status) => {
                // The pin was readable at entry; a read failure now means
                // it was reconfigured out from under us.
                return WaitOutcome {
                    status,
                    elapsed_ticks: elapsed.ticks(),
                    rollovers: elapsed.rollovers(),
                };
            }
        }
        if timeout.expired(&elapsed) {
            break;
        }
    }

    WaitOutcome {
        status: Status::Success,
        elapsed_ticks: elapsed.ticks(),
        rollovers: elapsed.rollovers(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakePins, FakeTimer};

    #[test]
    fn test_wait_reports_invalid_pin_sentinel() {
        let mut pins = FakePins::new();
        pins.mark_broken(8);
        let mut timer = FakeTimer::new(10);

        let outcome = wait_for_level(&mut pins, &mut timer, 8, true, 0, Timeout::Infinite);
        assert_eq!(outcome.status, Status::InvalidPin);
        assert_eq!(outcome.elapsed_ticks, INVALID_PIN_ELAPSED);
        assert_eq!(outcome.rollovers, 0);
        // The wait itself never started.
        assert_eq!(timer.samples(), 0);
    }

    #[test]
    fn test_wait_returns_once_level_matches() {
        let mut pins = FakePins::new();
        // Entry read, then three polls before the level arrives.
        pins.set_script(8, &[false, false, false, true]);
        let mut timer = FakeTimer::new(10);

        let outcome = wait_for_level(&mut pins, &mut timer, 8, true, 0, Timeout::Infinite);
        assert_eq!(outcome.status, Status::Success);
        assert_ne!(outcome.elapsed_ticks, INVALID_PIN_ELAPSED);
        assert_eq!(pins.reads(8), 4);
    }

    #[test]
    fn test_wait_honors_initial_delay() {
        let mut pins = FakePins::new();
        pins.set_level(8, true);
        let mut timer = FakeTimer::new(100);

        let outcome = wait_for_level(&mut pins, &mut timer, 8, true, 1000, Timeout::Infinite);
        assert_eq!(outcome.status, Status::Success);
        // The delay phase alone consumed 1000 ticks of counter time.
        assert!(outcome.elapsed_ticks >= 1000);
    }

    #[test]
    fn test_wait_times_out_with_or_semantics() {
        let mut pins = FakePins::new();
        pins.set_level(8, false);
        let mut timer = FakeTimer::new(100);

        let outcome =
            wait_for_level(&mut pins, &mut timer, 8, true, 0, Timeout::from_raw(500, 0));
        assert_eq!(outcome.status, Status::Success);
        assert!(outcome.elapsed_ticks >= 500);
        assert_eq!(outcome.rollovers, 0);
    }

    #[test]
    fn test_wait_zero_timeout_never_expires() {
        let mut pins = FakePins::new();
        // A long stretch of inactivity which a (0, 0) bound would cut
        // short if it were treated as a literal bound.
        let mut script = vec![false; 64];
        script.push(true);
        pins.set_script(8, &script);
        let mut timer = FakeTimer::new(10);

        let outcome = wait_for_level(&mut pins, &mut timer, 8, true, 0, Timeout::from_raw(0, 0));
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(pins.reads(8), 65);
    }

    #[test]
    fn test_wait_tracks_rollovers() {
        let mut pins = FakePins::new();
        pins.set_level(8, false);
        // Wraps after four samples; timeout needs one observed rollover.
        let mut timer = FakeTimer::new(0x4000_0000);

        let outcome =
            wait_for_level(&mut pins, &mut timer, 8, true, 0, Timeout::from_raw(1, 1));
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.rollovers, 1);
    }
}
