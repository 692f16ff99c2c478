//! Result-record encoding.
//!
//! Every operation answers the host with a fixed-layout little-endian
//! record. Each record type knows its wire size and encodes itself into a
//! caller-provided buffer, returning the number of bytes written. Decoders
//! exist for the host-side tooling and return `None` on a truncated slice.

use crate::busy::BusyPulseOutcome;
use crate::edge::EdgeIntervalOutcome;
use crate::status::Status;
use crate::wait::WaitOutcome;

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().expect("checked length"))
}

/// Busy-pulse result: status code, elapsed ticks, rollover count and the
/// tick scale the host needs to convert ticks to time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusyPulseReport {
    pub status: Status,
    pub elapsed_ticks: u32,
    pub rollovers: u32,
    pub ticks_per_ms: u32,
}

impl BusyPulseReport {
    pub const WIRE_LEN: usize = 16;

    pub fn new(outcome: &BusyPulseOutcome, ticks_per_ms: u32) -> Self {
        Self {
            status: outcome.status,
            elapsed_ticks: outcome.elapsed_ticks,
            rollovers: outcome.rollovers,
            ticks_per_ms,
        }
    }

    pub fn encode(&self, out: &mut [u8; Self::WIRE_LEN]) -> usize {
        put_u32(out, 0, self.status.code());
        put_u32(out, 4, self.elapsed_ticks);
        put_u32(out, 8, self.rollovers);
        put_u32(out, 12, self.ticks_per_ms);
        Self::WIRE_LEN
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::WIRE_LEN {
            return None;
        }
        Some(Self {
            status: Status::from_code(get_u32(buf, 0))?,
            elapsed_ticks: get_u32(buf, 4),
            rollovers: get_u32(buf, 8),
            ticks_per_ms: get_u32(buf, 12),
        })
    }
}

/// Pulse-wait result: status code, elapsed ticks and rollover count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PulseWaitReport {
    pub status: Status,
    pub elapsed_ticks: u32,
    pub rollovers: u32,
}

impl PulseWaitReport {
    pub const WIRE_LEN: usize = 12;

    pub fn new(outcome: &WaitOutcome) -> Self {
        Self {
            status: outcome.status,
            elapsed_ticks: outcome.elapsed_ticks,
            rollovers: outcome.rollovers,
        }
    }

    pub fn encode(&self, out: &mut [u8; Self::WIRE_LEN]) -> usize {
        put_u32(out, 0, self.status.code());
        put_u32(out, 4, self.elapsed_ticks);
        put_u32(out, 8, self.rollovers);
        Self::WIRE_LEN
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::WIRE_LEN {
            return None;
        }
        Some(Self {
            status: Status::from_code(get_u32(buf, 0))?,
            elapsed_ticks: get_u32(buf, 4),
            rollovers: get_u32(buf, 8),
        })
    }
}

/// Edge-interval result: tick delta between the two stamped edges, the
/// tick scale, and the low byte of the deadline-miss counter (capped at
/// 255 so a saturated count still reads as "many").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EdgeIntervalReport {
    pub delta_ticks: u32,
    pub ticks_per_ms: u32,
    pub timeout_counter: u8,
}

impl EdgeIntervalReport {
    pub const WIRE_LEN: usize = 9;

    pub fn new(outcome: &EdgeIntervalOutcome, ticks_per_ms: u32) -> Self {
        Self {
            delta_ticks: outcome.delta_ticks,
            ticks_per_ms,
            timeout_counter: outcome.timeout_counter.min(255) as u8,
        }
    }

    pub fn encode(&self, out: &mut [u8; Self::WIRE_LEN]) -> usize {
        put_u32(out, 0, self.delta_ticks);
        put_u32(out, 4, self.ticks_per_ms);
        out[8] = self.timeout_counter;
        Self::WIRE_LEN
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::WIRE_LEN {
            return None;
        }
        Some(Self {
            delta_ticks: get_u32(buf, 0),
            ticks_per_ms: get_u32(buf, 4),
            timeout_counter: buf[8],
        })
    }
}

/// Pin-read result: sampled level and the status of the read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinReadReport {
    pub level: bool,
    pub status: Status,
}

impl PinReadReport {
    pub const WIRE_LEN: usize = 5;

    pub fn encode(&self, out: &mut [u8; Self::WIRE_LEN]) -> usize {
        out[0] = self.level as u8;
        put_u32(out, 1, self.status.code());
        Self::WIRE_LEN
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::WIRE_LEN {
            return None;
        }
        Some(Self {
            level: buf[0] != 0,
            status: Status::from_code(get_u32(buf, 1))?,
        })
    }
}

/// Raw tick-counter snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimerValueReport {
    pub ticks: u32,
}

impl TimerValueReport {
    pub const WIRE_LEN: usize = 4;

    pub fn encode(&self, out: &mut [u8; Self::WIRE_LEN]) -> usize {
        put_u32(out, 0, self.ticks);
        Self::WIRE_LEN
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::WIRE_LEN {
            return None;
        }
        Some(Self {
            ticks: get_u32(buf, 0),
        })
    }
}
