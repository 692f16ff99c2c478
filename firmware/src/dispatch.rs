//! Command dispatch.
//!
//! One request frame in, one reply frame out. The first payload byte
//! selects the operation; the rest is the operation's parameter buffer.
//! Every operation runs to completion on the calling context before the
//! reply is encoded, so requests are serialized by construction.

use pulsebridge_common::busy::{measure_busy_pulse, TriggerBus, TriggerSpec};
use pulsebridge_common::edge::measure_edge_interval;
use pulsebridge_common::gpio::{self, GpioBridge};
use pulsebridge_common::pulse::{configure_periodic, drive_pulse};
use pulsebridge_common::report::{
    BusyPulseReport, EdgeIntervalReport, PinReadReport, PulseWaitReport, TimerValueReport,
};
use pulsebridge_common::request::{
    BusyPulseRequest, EdgeIntervalRequest, PeriodicConfigRequest, PulseDriveRequest,
    PulseWaitRequest, TriggerRequest,
};
use pulsebridge_common::status::Status;
use pulsebridge_common::timer::{TickTimer, TimerConfig, Timeout};
use pulsebridge_common::wait::wait_for_level;
use pulsebridge_common::INVALID_PIN_ELAPSED;

use crate::channel::MAX_FRAME_LEN;

/// Settling stall between the two bytes of a register-write trigger, in
/// microseconds.
const REGISTER_STALL_US: u32 = 25;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    PulseDrive,
    PulseWait,
    BusyPulse,
    EdgeInterval,
    PeriodicEnable,
    PeriodicDisable,
    PinRead,
    PinSet,
    TimerRead,
}

impl Command {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::PulseDrive),
            0x02 => Some(Self::PulseWait),
            0x03 => Some(Self::BusyPulse),
            0x04 => Some(Self::EdgeInterval),
            0x05 => Some(Self::PeriodicEnable),
            0x06 => Some(Self::PeriodicDisable),
            0x07 => Some(Self::PinRead),
            0x08 => Some(Self::PinSet),
            0x09 => Some(Self::TimerRead),
            _ => None,
        }
    }
}

pub struct Dispatcher<G, T, B> {
    gpio: G,
    timer: T,
    bus: B,
    config: TimerConfig,
}

impl<G, T, B> Dispatcher<G, T, B>
where
    G: GpioBridge,
    T: TickTimer,
    B: TriggerBus,
{
    pub fn new(gpio: G, timer: T, bus: B, config: TimerConfig) -> Self {
        Self {
            gpio,
            timer,
            bus,
            config,
        }
    }

    /// Run one request and encode its reply into `out`, returning the
    /// reply length. Malformed frames answer with a bare status record.
    pub fn handle(&mut self, frame: &[u8], out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let command = match frame.first().copied().and_then(Command::from_code) {
            Some(command) => command,
            None => return encode_status(Status::InvalidArgument, out),
        };
        let payload = &frame[1..];

        match command {
            Command::PulseDrive => self.pulse_drive(payload, out),
            Command::PulseWait => self.pulse_wait(payload, out),
            Command::BusyPulse => self.busy_pulse(payload, out),
            Command::EdgeInterval => self.edge_interval(payload, out),
            Command::PeriodicEnable => self.periodic(payload, true, out),
            Command::PeriodicDisable => self.periodic(payload, false, out),
            Command::PinRead => self.pin_read(payload, out),
            Command::PinSet => self.pin_set(payload, out),
            Command::TimerRead => self.timer_read(out),
        }
    }

    fn pulse_drive(&mut self, payload: &[u8], out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let request = match PulseDriveRequest::parse(payload) {
            Ok(request) => request,
            Err(status) => return encode_status(status, out),
        };
        let result = drive_pulse(
            &mut self.gpio,
            &mut self.timer,
            request.pin,
            request.polarity,
            request.duration_ticks,
            request.duration_rollovers,
        );
        encode_status(result.err().unwrap_or(Status::Success), out)
    }

    fn pulse_wait(&mut self, payload: &[u8], out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let request = match PulseWaitRequest::parse(payload) {
            Ok(request) => request,
            Err(status) => return encode_status(status, out),
        };
        let delay_ticks = match self.config.ms_to_ticks(request.delay_ms) {
            Ok(ticks) => ticks,
            Err(status) => {
                let report = PulseWaitReport {
                    status,
                    elapsed_ticks: INVALID_PIN_ELAPSED,
                    rollovers: 0,
                };
                return encode_wait(&report, out);
            }
        };
        let outcome = wait_for_level(
            &mut self.gpio,
            &mut self.timer,
            request.pin,
            request.polarity,
            delay_ticks,
            Timeout::from_raw(request.timeout_ticks, request.timeout_rollovers),
        );
        encode_wait(&PulseWaitReport::new(&outcome), out)
    }

    fn busy_pulse(&mut self, payload: &[u8], out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let request = match BusyPulseRequest::parse(payload) {
            Ok(request) => request,
            Err(status) => return encode_status(status, out),
        };
        let converted = self.config.ms_to_ticks(request.timeout_ms).and_then(|timeout| {
            let trigger = match request.trigger {
                TriggerRequest::Register { addr, value } => TriggerSpec::Register {
                    addr,
                    value,
                    stall_us: REGISTER_STALL_US,
                },
                TriggerRequest::Pin {
                    pin,
                    polarity,
                    drive_ms,
                } => TriggerSpec::Pin {
                    pin,
                    polarity,
                    drive_ticks: self.config.ms_to_ticks(drive_ms)?,
                },
            };
            Ok((timeout, trigger))
        });
        let (timeout_ticks, trigger) = match converted {
            Ok(pair) => pair,
            Err(status) => {
                let report = BusyPulseReport {
                    status,
                    elapsed_ticks: INVALID_PIN_ELAPSED,
                    rollovers: 0,
                    ticks_per_ms: self.config.ticks_per_ms,
                };
                return encode_busy(&report, out);
            }
        };
        let outcome = measure_busy_pulse(
            &mut self.gpio,
            &mut self.timer,
            &mut self.bus,
            &self.config,
            request.busy_pin,
            request.busy_polarity,
            Timeout::from_ticks(timeout_ticks),
            trigger,
        );
        encode_busy(&BusyPulseReport::new(&outcome, self.config.ticks_per_ms), out)
    }

    fn edge_interval(&mut self, payload: &[u8], out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let request = match EdgeIntervalRequest::parse(payload) {
            Ok(request) => request,
            Err(status) => return encode_status(status, out),
        };
        // A timeout too long for the tick scale saturates: the deadline
        // window only feeds the miss counter, so "practically never" is an
        // acceptable reading of an oversized request.
        let timeout_ticks = self
            .config
            .ms_to_ticks(request.timeout_ms)
            .unwrap_or(u32::MAX);
        let outcome = measure_edge_interval(
            &mut self.gpio,
            &mut self.timer,
            request.pin,
            request.polarity,
            timeout_ticks,
        );
        encode_edge(
            &EdgeIntervalReport::new(&outcome, self.config.ticks_per_ms),
            out,
        )
    }

    fn periodic(&mut self, payload: &[u8], enable: bool, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let request = match PeriodicConfigRequest::parse(payload) {
            Ok(request) => request,
            Err(status) => return encode_status(status, out),
        };
        let result = configure_periodic(
            &mut self.gpio,
            request.pin,
            enable,
            request.period,
            request.threshold,
        );
        encode_status(result.err().unwrap_or(Status::Success), out)
    }

    fn pin_read(&mut self, payload: &[u8], out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        if payload.len() < 2 {
            return encode_status(Status::InvalidArgument, out);
        }
        let pin = u16::from_le_bytes([payload[0], payload[1]]);
        let report = match gpio::ensure_input(&mut self.gpio, pin) {
            Ok(level) => PinReadReport {
                level,
                status: Status::Success,
            },
            Err(status) => PinReadReport {
                level: false,
                status,
            },
        };
        encode_pin_read(&report, out)
    }

    fn pin_set(&mut self, payload: &[u8], out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        if payload.len() < 3 {
            return encode_status(Status::InvalidArgument, out);
        }
        let pin = u16::from_le_bytes([payload[0], payload[1]]);
        let level = payload[2] != 0;
        let result = gpio::force_output(&mut self.gpio, pin, level);
        encode_status(result.err().unwrap_or(Status::Success), out)
    }

    fn timer_read(&mut self, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
        let report = TimerValueReport {
            ticks: self.timer.sample_now(),
        };
        encode_timer(&report, out)
    }
}

fn encode_status(status: Status, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
    out[..4].copy_from_slice(&status.code().to_le_bytes());
    4
}

fn encode_busy(report: &BusyPulseReport, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
    let mut record = [0u8; BusyPulseReport::WIRE_LEN];
    let len = report.encode(&mut record);
    out[..len].copy_from_slice(&record);
    len
}

fn encode_wait(report: &PulseWaitReport, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
    let mut record = [0u8; PulseWaitReport::WIRE_LEN];
    let len = report.encode(&mut record);
    out[..len].copy_from_slice(&record);
    len
}

fn encode_edge(report: &EdgeIntervalReport, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
    let mut record = [0u8; EdgeIntervalReport::WIRE_LEN];
    let len = report.encode(&mut record);
    out[..len].copy_from_slice(&record);
    len
}

fn encode_pin_read(report: &PinReadReport, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
    let mut record = [0u8; PinReadReport::WIRE_LEN];
    let len = report.encode(&mut record);
    out[..len].copy_from_slice(&record);
    len
}

fn encode_timer(report: &TimerValueReport, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
    let mut record = [0u8; TimerValueReport::WIRE_LEN];
    let len = report.encode(&mut record);
    out[..len].copy_from_slice(&record);
    len
}
