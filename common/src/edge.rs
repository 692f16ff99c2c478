//! Differential edge-interval measurement.
//!
//! Characterizes a periodic data-ready style signal by timing the gap
//! between two successive assertions of a pin, referenced to a baseline
//! sample taken at entry.

use crate::gpio::{self, GpioBridge};
use crate::timer::TickTimer;
use crate::INVALID_PIN_ELAPSED;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EdgeIntervalOutcome {
    /// Tick delta between the two observed edges, or 0xFFFF_FFFF when the
    /// pin cannot act as an input.
    pub delta_ticks: u32,
    /// Poll iterations that ran past the deadline window. Saturating; the
    /// wire encoding carries the low byte (capped at 255).
    pub timeout_counter: u32,
}

/// Deadline window over the wrapping 32-bit counter.
///
/// When `start + timeout` passes 0xFFFF_FFFF the window wraps and "past
/// the deadline" becomes the gap between the wrapped end and the start.
struct DeadlineWindow {
    bounded: bool,
    wraps: bool,
    start: u32,
    end: u32,
}

impl DeadlineWindow {
    fn new(start: u32, timeout_ticks: u32) -> Self {
        let wraps = timeout_ticks > 0 && start > u32::MAX - timeout_ticks;
        let end = if wraps {
            timeout_ticks - (u32::MAX - start)
        } else {
            start.wrapping_add(timeout_ticks)
        };
        Self {
            bounded: timeout_ticks > 0,
            wraps,
            start,
            end,
        }
    }

    fn missed(&self, now: u32) -> bool {
        if !self.bounded {
            return false;
        }
        if self.wraps {
            now < self.start && now > self.end
        } else {
            now > self.end
        }
    }
}

/// Measure the tick interval between two assertions of `pin` at `polarity`.
///
/// Each observation first waits for the pin to leave the active level
/// (covering the case where the edge already happened), then for it to
/// assert again. Iterations past the deadline only bump the miss counter;
/// see `poll_for_level` for why the loop never aborts.
pub fn measure_edge_interval(
    gpio: &mut impl GpioBridge,
    timer: &mut impl TickTimer,
    pin: u16,
    polarity: bool,
    timeout_ticks: u32,
) -> EdgeIntervalOutcome {
    let start = timer.sample_now();
    let window = DeadlineWindow::new(start, timeout_ticks);

    if gpio::ensure_input(gpio, pin).is_err() {
        return EdgeIntervalOutcome {
            delta_ticks: INVALID_PIN_ELAPSED,
            timeout_counter: 0,
        };
    }

    let mut timeout_counter: u32 = 0;
    let mut edge_elapsed = [0u32; 2];

    for slot in edge_elapsed.iter_mut() {
        poll_for_level(gpio, timer, pin, !polarity, &window, &mut timeout_counter);
        poll_for_level(gpio, timer, pin, polarity, &window, &mut timeout_counter);
        *slot = elapsed_since(start, timer.sample_now());
    }

    EdgeIntervalOutcome {
        delta_ticks: edge_elapsed[1].wrapping_sub(edge_elapsed[0]),
        timeout_counter,
    }
}

/// Poll until `pin` reads `level`.
///
/// Iterations past the deadline window only bump `timeout_counter`; the
/// loop exits on the level alone. Both edges are needed for the
/// differential result even when they arrive late, so a timeout must not
/// abort the measurement. The flip side is that a pin which never
/// transitions hangs the operation (see DESIGN.md).
fn poll_for_level(
    gpio: &mut impl GpioBridge,
    timer: &mut impl TickTimer,
    pin: u16,
    level: bool,
    window: &DeadlineWindow,
    timeout_counter: &mut u32,
) {
    loop {
        if gpio.read_level(pin).unwrap_or(level) == level {
            return;
        }
        if window.missed(timer.sample_now()) {
            *timeout_counter = timeout_counter.saturating_add(1);
        }
    }
}

/// Elapsed ticks since `start`, corrected for a counter wrap.
fn elapsed_since(start: u32, now: u32) -> u32 {
    if now >= start {
        now - start
    } else {
        now.wrapping_add(u32::MAX - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakePins, FakeTimer};

    use rstest::rstest;

    #[test]
    fn test_invalid_pin_skips_measurement() {
        let mut pins = FakePins::new();
        pins.mark_broken(6);
        let mut timer = FakeTimer::new(10);

        let outcome = measure_edge_interval(&mut pins, &mut timer, 6, true, 1000);
        assert_eq!(outcome.delta_ticks, INVALID_PIN_ELAPSED);
        assert_eq!(outcome.timeout_counter, 0);
    }

    #[test]
    fn test_interval_between_two_edges() {
        let mut pins = FakePins::new();
        // Pin idles low; two pulses, one poll wide each, three polls apart.
        pins.set_script(
            6,
            &[
                false, // entry read
                false, true, // first edge
                true, false, false, true, // second edge
            ],
        );
        let mut timer = FakeTimer::new(10);

        let outcome = measure_edge_interval(&mut pins, &mut timer, 6, true, 0);

        // Counter samples, in steps of 10: baseline, first edge stamp,
        // one miss each in the leave and assert phases, second edge stamp.
        // The stamps land at 10 and 40.
        assert_eq!(outcome.delta_ticks, 30);
        assert_eq!(outcome.timeout_counter, 0);
    }

    #[test]
    fn test_pin_already_asserted_waits_for_deassert_first() {
        let mut pins = FakePins::new();
        // Starts high: the stale edge is skipped before arming.
        pins.set_script(6, &[true, true, false, true, false, true]);
        let mut timer = FakeTimer::new(10);

        let outcome = measure_edge_interval(&mut pins, &mut timer, 6, true, 0);

        // First observation needs the high-to-low transition before the
        // fresh low-to-high edge counts.
        assert_eq!(pins.reads(6), 6);
        assert_ne!(outcome.delta_ticks, INVALID_PIN_ELAPSED);
    }

    #[test]
    fn test_misses_counted_without_aborting() {
        let mut pins = FakePins::new();
        // Low for a long stretch before each edge; a 1-tick deadline means
        // nearly every poll is a miss.
        let mut script = vec![false; 10];
        script.push(true);
        script.extend([false; 10]);
        script.push(true);
        pins.set_script(6, &script);
        let mut timer = FakeTimer::new(10);

        let outcome = measure_edge_interval(&mut pins, &mut timer, 6, true, 1);

        // The loop still delivered both edges.
        assert_ne!(outcome.delta_ticks, INVALID_PIN_ELAPSED);
        assert!(outcome.timeout_counter > 0);
    }

    #[test]
    fn test_unconfigured_pin_recovers_at_entry() {
        let mut pins = FakePins::new();
        pins.set_script(6, &[true, false, true, false, true]);
        pins.mark_unconfigured(6);
        let mut timer = FakeTimer::new(10);

        // The entry recovery path configures the pin; the measurement then
        // runs instead of reporting the sentinel.
        let outcome = measure_edge_interval(&mut pins, &mut timer, 6, true, 0);
        assert_ne!(outcome.delta_ticks, INVALID_PIN_ELAPSED);
    }

    #[rstest]
    #[case(0, 0, 100, false)] // unbounded: nothing ever misses
    #[case(100, 50, 140, false)]
    #[case(100, 50, 151, true)]
    #[case(u32::MAX - 10, 50, 39, false)] // wrapped window, before end
    #[case(u32::MAX - 10, 50, 41, true)] // wrapped window, past end
    #[case(u32::MAX - 10, 50, u32::MAX - 5, false)] // still inside the tail
    fn test_deadline_window(
        #[case] start: u32,
        #[case] timeout: u32,
        #[case] now: u32,
        #[case] missed: bool,
    ) {
        let window = DeadlineWindow::new(start, timeout);
        assert_eq!(window.missed(now), missed);
    }

    #[rstest]
    #[case(100, 100, 0)]
    #[case(100, 250, 150)]
    #[case(u32::MAX - 10, 20, 30)] // wrapped: 10 to the top, 20 past it
    fn test_elapsed_since_wrap_correction(
        #[case] start: u32,
        #[case] now: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(elapsed_since(start, now), expected);
    }
}
