//! Access to the free-running hardware tick counter.
//!
//! The counter is 32 bits wide and wraps from 0xFFFF_FFFF to 0. Nothing in
//! this subsystem ever compares two samples for ordering without rollover
//! awareness; [`RolloverTracker`] is the one place that bookkeeping lives.

use crate::status::Status;

/// Free-running 32-bit tick counter.
pub trait TickTimer {
    /// Trigger a sample-and-capture cycle and return the latched value.
    ///
    /// Implementations busy-wait internally until the hardware reports the
    /// sample complete (bounded, sub-microsecond on real hardware).
    fn sample_now(&mut self) -> u32;

    /// Zero the counter and disable any counter-generated interrupts. All
    /// waiting in this subsystem is by polling.
    fn reset(&mut self);
}

/// Fixed-at-boot timing configuration.
///
/// Passed explicitly into every operation that needs it, so there is no
/// hidden shared board state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimerConfig {
    /// Tick counter increments per millisecond (the scale factor exposed in
    /// result payloads).
    pub ticks_per_ms: u32,
    /// Fixed overhead of the microsecond stall helper, in microseconds.
    /// Calibrated with a logic analyzer.
    pub stall_offset_us: u32,
}

impl TimerConfig {
    pub const fn new(ticks_per_ms: u32, stall_offset_us: u32) -> Self {
        Self {
            ticks_per_ms,
            stall_offset_us,
        }
    }

    /// Convert milliseconds to timer ticks.
    ///
    /// Durations whose tick count does not fit in 32 bits are rejected
    /// rather than silently truncated.
    pub fn ms_to_ticks(&self, ms: u32) -> Result<u32, Status> {
        ms.checked_mul(self.ticks_per_ms)
            .ok_or(Status::InvalidArgument)
    }

    /// The longest duration (in microseconds) that `stall_us` can convert
    /// without overflowing the scale multiply.
    pub fn max_stall_us(&self) -> u32 {
        u32::MAX / self.ticks_per_ms
    }
}

/// Busy-wait for `us` microseconds on the tick counter.
///
/// The calibration offset is subtracted up front; a request at or below the
/// offset returns immediately (the fixed overhead alone already covers it).
/// Requests beyond [`TimerConfig::max_stall_us`] fail with
/// [`Status::InvalidArgument`] instead of sleeping a truncated duration;
/// callers needing longer waits should use a scheduler sleep.
pub fn stall_us(
    timer: &mut impl TickTimer,
    config: &TimerConfig,
    us: u32,
) -> Result<(), Status> {
    // Reset first to keep the overhead out of the measured window.
    timer.reset();

    let us = match us.checked_sub(config.stall_offset_us) {
        Some(remaining) if remaining > 0 => remaining,
        _ => return Ok(()),
    };

    if us > config.max_stall_us() {
        return Err(Status::InvalidArgument);
    }

    // Scale via the millisecond multiplier, then back down to microseconds.
    let ticks = us * config.ticks_per_ms / 1000;

    while timer.sample_now() < ticks {}
    Ok(())
}

/// Rollover-aware elapsed-time bookkeeping over consecutive samples.
///
/// A new sample numerically below the previous one counts as exactly one
/// wrap. Poll loops must run fast enough that at most one wrap can happen
/// between samples; multi-wrap conditions are not detectable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RolloverTracker {
    current: u32,
    last: u32,
    rollovers: u32,
}

impl RolloverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next counter sample.
    pub fn record(&mut self, sample: u32) {
        self.last = self.current;
        self.current = sample;
        if self.current < self.last {
            self.rollovers += 1;
        }
    }

    /// Ticks of the most recent sample.
    pub fn ticks(&self) -> u32 {
        self.current
    }

    /// Wraps observed since construction.
    pub fn rollovers(&self) -> u32 {
        self.rollovers
    }
}

/// Wait bound for polled operations.
///
/// An all-zero raw bound means "no timeout" by wire convention; a literal
/// zero bound would otherwise expire on the first poll.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timeout {
    Infinite,
    At { ticks: u32, rollovers: u32 },
}

impl Timeout {
    pub fn from_raw(ticks: u32, rollovers: u32) -> Self {
        if ticks == 0 && rollovers == 0 {
            Self::Infinite
        } else {
            Self::At { ticks, rollovers }
        }
    }

    /// From a plain tick bound with no rollover component.
    pub fn from_ticks(ticks: u32) -> Self {
        Self::from_raw(ticks, 0)
    }

    /// Whether the elapsed pair has reached the bound. Both the tick bound
    /// and the rollover bound must be met.
    pub fn expired(&self, elapsed: &RolloverTracker) -> bool {
        match *self {
            Self::Infinite => false,
            Self::At { ticks, rollovers } => {
                elapsed.ticks() >= ticks && elapsed.rollovers() >= rollovers
            }
        }
    }
}
