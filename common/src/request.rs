//! Request-buffer decoding.
//!
//! Operation parameters arrive pre-copied into a little-endian byte buffer
//! by the control-transfer handler; this module only consumes the buffered
//! bytes at their fixed offsets. A buffer too short for its operation is
//! rejected up front.

use crate::status::Status;

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(buf[at..at + 2].try_into().expect("checked length"))
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().expect("checked length"))
}

fn check_len(buf: &[u8], needed: usize) -> Result<(), Status> {
    if buf.len() < needed {
        Err(Status::InvalidArgument)
    } else {
        Ok(())
    }
}

/// Trigger selection as it appears on the wire. The register variant's
/// stall duration is not carried in the request; it comes from the boot
/// calibration (`TimerConfig`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriggerRequest {
    Register { addr: u16, value: u16 },
    Pin { pin: u16, polarity: bool, drive_ms: u32 },
}

/// Busy-pulse measurement parameters.
///
/// Layout: busy pin (2), busy polarity (1), timeout ms (4), trigger mode
/// flag (1), then either register address (2) + value (2) or trigger pin
/// (2) + polarity (1) + drive ms (4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusyPulseRequest {
    pub busy_pin: u16,
    pub busy_polarity: bool,
    pub timeout_ms: u32,
    pub trigger: TriggerRequest,
}

impl BusyPulseRequest {
    pub fn parse(buf: &[u8]) -> Result<Self, Status> {
        check_len(buf, 8)?;
        let register_mode = buf[7] != 0;
        let trigger = if register_mode {
            check_len(buf, 12)?;
            TriggerRequest::Register {
                addr: u16_at(buf, 8),
                value: u16_at(buf, 10),
            }
        } else {
            check_len(buf, 15)?;
            TriggerRequest::Pin {
                pin: u16_at(buf, 8),
                polarity: buf[10] != 0,
                drive_ms: u32_at(buf, 11),
            }
        };
        Ok(Self {
            busy_pin: u16_at(buf, 0),
            busy_polarity: buf[2] != 0,
            timeout_ms: u32_at(buf, 3),
            trigger,
        })
    }
}

/// Pulse-wait parameters.
///
/// Layout: pin (2), polarity (1), delay ms (4), timeout ticks (4),
/// timeout rollovers (4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PulseWaitRequest {
    pub pin: u16,
    pub polarity: bool,
    pub delay_ms: u32,
    pub timeout_ticks: u32,
    pub timeout_rollovers: u32,
}

impl PulseWaitRequest {
    pub fn parse(buf: &[u8]) -> Result<Self, Status> {
        check_len(buf, 15)?;
        Ok(Self {
            pin: u16_at(buf, 0),
            polarity: buf[2] != 0,
            delay_ms: u32_at(buf, 3),
            timeout_ticks: u32_at(buf, 7),
            timeout_rollovers: u32_at(buf, 11),
        })
    }
}

/// Pulse-drive parameters.
///
/// Layout: pin (2), polarity (1), duration ticks (4), duration
/// rollovers (4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PulseDriveRequest {
    pub pin: u16,
    pub polarity: bool,
    pub duration_ticks: u32,
    pub duration_rollovers: u32,
}

impl PulseDriveRequest {
    pub fn parse(buf: &[u8]) -> Result<Self, Status> {
        check_len(buf, 11)?;
        Ok(Self {
            pin: u16_at(buf, 0),
            polarity: buf[2] != 0,
            duration_ticks: u32_at(buf, 3),
            duration_rollovers: u32_at(buf, 7),
        })
    }
}

/// Periodic-waveform configuration. The enable/disable choice travels in
/// the command code, not the parameter buffer.
///
/// Layout: pin (2), period (4), threshold (4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PeriodicConfigRequest {
    pub pin: u16,
    pub period: u32,
    pub threshold: u32,
}

impl PeriodicConfigRequest {
    pub fn parse(buf: &[u8]) -> Result<Self, Status> {
        check_len(buf, 10)?;
        Ok(Self {
            pin: u16_at(buf, 0),
            period: u32_at(buf, 2),
            threshold: u32_at(buf, 6),
        })
    }
}

/// Edge-interval measurement parameters.
///
/// Layout: pin (2), polarity (1), reserved (4), timeout ms (4). Bytes
/// 3..7 are reserved by the wire layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EdgeIntervalRequest {
    pub pin: u16,
    pub polarity: bool,
    pub timeout_ms: u32,
}

impl EdgeIntervalRequest {
    pub fn parse(buf: &[u8]) -> Result<Self, Status> {
        check_len(buf, 11)?;
        Ok(Self {
            pin: u16_at(buf, 0),
            polarity: buf[2] != 0,
            timeout_ms: u32_at(buf, 7),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_busy_pulse_register_trigger() {
        let buf = [
            0x05, 0x00, // busy pin
            0x01, // busy polarity
            0xE8, 0x03, 0x00, 0x00, // timeout: 1000 ms
            0x01, // register trigger mode
            0x10, 0x00, // register address
            0xCD, 0xAB, // register value
        ];
        let request = BusyPulseRequest::parse(&buf).unwrap();
        assert_eq!(request.busy_pin, 5);
        assert!(request.busy_polarity);
        assert_eq!(request.timeout_ms, 1000);
        assert_eq!(
            request.trigger,
            TriggerRequest::Register {
                addr: 0x10,
                value: 0xABCD
            }
        );
    }

    #[test]
    fn test_parse_busy_pulse_pin_trigger() {
        let buf = [
            0x05, 0x00, // busy pin
            0x00, // busy polarity
            0x00, 0x00, 0x00, 0x00, // timeout: infinite
            0x00, // pin trigger mode
            0x09, 0x00, // trigger pin
            0x01, // trigger polarity
            0x32, 0x00, 0x00, 0x00, // drive: 50 ms
        ];
        let request = BusyPulseRequest::parse(&buf).unwrap();
        assert_eq!(
            request.trigger,
            TriggerRequest::Pin {
                pin: 9,
                polarity: true,
                drive_ms: 50
            }
        );
    }

    #[test]
    fn test_parse_busy_pulse_short_buffer() {
        // Mode flag says pin trigger, but the trigger fields are missing.
        let buf = [0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09];
        assert_eq!(BusyPulseRequest::parse(&buf), Err(Status::InvalidArgument));
        assert_eq!(BusyPulseRequest::parse(&[]), Err(Status::InvalidArgument));
    }

    #[test]
    fn test_parse_pulse_wait() {
        let buf = [
            0x08, 0x00, // pin
            0x01, // polarity
            0x0A, 0x00, 0x00, 0x00, // delay: 10 ms
            0x10, 0x27, 0x00, 0x00, // timeout ticks: 10000
            0x02, 0x00, 0x00, 0x00, // timeout rollovers: 2
        ];
        let request = PulseWaitRequest::parse(&buf).unwrap();
        assert_eq!(request.pin, 8);
        assert!(request.polarity);
        assert_eq!(request.delay_ms, 10);
        assert_eq!(request.timeout_ticks, 10_000);
        assert_eq!(request.timeout_rollovers, 2);
    }

    #[test]
    fn test_parse_pulse_drive() {
        let buf = [
            0x02, 0x00, // pin
            0x00, // polarity
            0x40, 0x42, 0x0F, 0x00, // duration ticks: 1_000_000
            0x01, 0x00, 0x00, 0x00, // duration rollovers: 1
        ];
        let request = PulseDriveRequest::parse(&buf).unwrap();
        assert_eq!(request.pin, 2);
        assert!(!request.polarity);
        assert_eq!(request.duration_ticks, 1_000_000);
        assert_eq!(request.duration_rollovers, 1);
    }

    #[test]
    fn test_parse_periodic_config() {
        let buf = [
            0x02, 0x00, // pin
            0xE8, 0x03, 0x00, 0x00, // period: 1000
            0xFA, 0x00, 0x00, 0x00, // threshold: 250
        ];
        let request = PeriodicConfigRequest::parse(&buf).unwrap();
        assert_eq!(request.pin, 2);
        assert_eq!(request.period, 1000);
        assert_eq!(request.threshold, 250);
    }

    #[test]
    fn test_parse_edge_interval_skips_reserved_bytes() {
        let buf = [
            0x06, 0x00, // pin
            0x01, // polarity
            0xEE, 0xEE, 0xEE, 0xEE, // reserved
            0xF4, 0x01, 0x00, 0x00, // timeout: 500 ms
        ];
        let request = EdgeIntervalRequest::parse(&buf).unwrap();
        assert_eq!(request.pin, 6);
        assert!(request.polarity);
        assert_eq!(request.timeout_ms, 500);
    }
}
