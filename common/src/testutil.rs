//! Scripted hardware doubles for the polling loops.

use std::collections::{HashMap, HashSet};

use crate::busy::TriggerBus;
use crate::gpio::GpioBridge;
use crate::status::Status;
use crate::timer::TickTimer;

/// Tick counter double.
///
/// Each `sample_now` returns the current count and then advances it by a
/// fixed step, wrapping like the hardware counter. The "sample complete"
/// busy-wait of real hardware is modelled as completing instantly.
pub struct FakeTimer {
    now: u32,
    step: u32,
    samples: usize,
}

impl FakeTimer {
    pub fn new(step: u32) -> Self {
        Self::starting_at(0, step)
    }

    pub fn starting_at(now: u32, step: u32) -> Self {
        Self {
            now,
            step,
            samples: 0,
        }
    }

    /// Total `sample_now` calls so far.
    pub fn samples(&self) -> usize {
        self.samples
    }
}

impl TickTimer for FakeTimer {
    fn sample_now(&mut self) -> u32 {
        self.samples += 1;
        let sample = self.now;
        self.now = self.now.wrapping_add(self.step);
        sample
    }

    fn reset(&mut self) {
        self.now = 0;
    }
}

/// Configuration events observed by [`FakePins`]. Only successful
/// configuration calls are logged; level reads are not.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinEvent {
    Input(u16),
    Output(u16, bool),
    Write(u16, bool),
    Release(u16),
    Waveform(u16, u32, u32),
}

/// GPIO double with per-pin level scripts and failure injection.
#[derive(Default)]
pub struct FakePins {
    /// Levels returned by successive reads of a pin; the last entry repeats
    /// once the script is exhausted.
    scripts: HashMap<u16, Vec<bool>>,
    reads: HashMap<u16, usize>,
    /// Pins that reject every configuration attempt and every read.
    broken: HashSet<u16>,
    /// Pins whose reads fail until they are configured as inputs.
    unconfigured: HashSet<u16>,
    /// Pins that reject configuration until released once.
    flaky: HashSet<u16>,
    /// Per-pin read budgets; reads at or past the budget fail.
    read_budgets: HashMap<u16, usize>,
    pub log: Vec<PinEvent>,
}

impl FakePins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the levels returned by successive reads of `pin`.
    pub fn set_script(&mut self, pin: u16, levels: &[bool]) {
        assert!(!levels.is_empty());
        self.scripts.insert(pin, levels.to_vec());
    }

    /// Pin reads a constant level.
    pub fn set_level(&mut self, pin: u16, level: bool) {
        self.set_script(pin, &[level]);
    }

    pub fn mark_broken(&mut self, pin: u16) {
        self.broken.insert(pin);
    }

    pub fn mark_unconfigured(&mut self, pin: u16) {
        self.unconfigured.insert(pin);
    }

    pub fn mark_flaky(&mut self, pin: u16) {
        self.flaky.insert(pin);
    }

    /// Let `pin` read successfully `budget` times, then fail every further
    /// read as if the pin had been reconfigured underneath the operation.
    pub fn fail_reads_after(&mut self, pin: u16, budget: usize) {
        self.read_budgets.insert(pin, budget);
    }

    /// Number of level reads performed on `pin`.
    pub fn reads(&self, pin: u16) -> usize {
        self.reads.get(&pin).copied().unwrap_or(0)
    }
}

impl GpioBridge for FakePins {
    fn configure_input(&mut self, pin: u16) -> Result<(), Status> {
        if self.broken.contains(&pin) || self.flaky.contains(&pin) {
            return Err(Status::ConfigFailed);
        }
        self.unconfigured.remove(&pin);
        self.log.push(PinEvent::Input(pin));
        Ok(())
    }

    fn configure_output(&mut self, pin: u16, level: bool) -> Result<(), Status> {
        if self.broken.contains(&pin) || self.flaky.contains(&pin) {
            return Err(Status::ConfigFailed);
        }
        self.log.push(PinEvent::Output(pin, level));
        Ok(())
    }

    fn read_level(&mut self, pin: u16) -> Result<bool, Status> {
        if self.broken.contains(&pin) || self.unconfigured.contains(&pin) {
            return Err(Status::InvalidPin);
        }
        if let Some(&budget) = self.read_budgets.get(&pin) {
            if self.reads(pin) >= budget {
                return Err(Status::InvalidPin);
            }
        }
        let script = self.scripts.get(&pin).expect("no level script for pin");
        let index = self.reads.entry(pin).or_insert(0);
        let level = script[(*index).min(script.len() - 1)];
        *index += 1;
        Ok(level)
    }

    fn write_level(&mut self, pin: u16, level: bool) -> Result<(), Status> {
        if self.broken.contains(&pin) {
            return Err(Status::ConfigFailed);
        }
        self.log.push(PinEvent::Write(pin, level));
        Ok(())
    }

    fn release(&mut self, pin: u16) -> Result<(), Status> {
        if self.broken.contains(&pin) {
            return Err(Status::ConfigFailed);
        }
        self.flaky.remove(&pin);
        self.log.push(PinEvent::Release(pin));
        Ok(())
    }

    fn configure_waveform(&mut self, pin: u16, period: u32, threshold: u32) -> Result<(), Status> {
        if self.broken.contains(&pin) || self.flaky.contains(&pin) {
            return Err(Status::ConfigFailed);
        }
        self.log.push(PinEvent::Waveform(pin, period, threshold));
        Ok(())
    }
}

/// Sideband register bus double recording every write.
#[derive(Default)]
pub struct FakeTriggerBus {
    pub writes: Vec<(u16, u8)>,
}

impl FakeTriggerBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerBus for FakeTriggerBus {
    fn write_register(&mut self, addr: u16, value: u8) -> Result<(), Status> {
        self.writes.push((addr, value));
        Ok(())
    }
}
