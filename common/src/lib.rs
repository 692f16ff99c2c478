#![cfg_attr(not(test), no_std)]
//! # Pulsebridge timing core
//!
//! Precision GPIO timing services for the Pulsebridge sensor-evaluation
//! bridge: pulse generation, pulse waits, triggered busy-pulse measurement
//! and differential edge-interval measurement, all referenced to a
//! free-running 32-bit hardware tick counter.
//!
//! Hardware is consumed through capabilities (`TickTimer`, `GpioBridge`,
//! `TriggerBus`) so that every polling loop in here runs unchanged on the
//! target and against scripted doubles in the test suite. All waiting is by
//! busy-polling; no interrupts are used by this subsystem.

pub mod busy;
pub mod edge;
pub mod gpio;
pub mod pulse;
pub mod report;
pub mod request;
pub mod status;
pub mod timer;
pub mod wait;

#[cfg(test)]
mod testutil;

/// Sentinel elapsed value reported when the target pin cannot act as an
/// input. Part of the wire contract with the host.
pub const INVALID_PIN_ELAPSED: u32 = 0xFFFF_FFFF;
