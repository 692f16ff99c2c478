//! Operation status codes.
//!
//! Every result record carries one of these as its 4-byte status word, so
//! the numeric values are part of the wire contract with the host.

use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// The operation ran to completion (a timed-out wait still counts as
    /// complete; the host distinguishes by comparing elapsed against the
    /// requested bound).
    Success,
    /// A requested duration is outside the representable range for the
    /// tick conversion.
    InvalidArgument,
    /// The pin could not be read or configured as required, even after the
    /// reconfiguration retry.
    InvalidPin,
    /// The hardware rejected a pin or timer configuration.
    ConfigFailed,
}

impl Status {
    /// The 4-byte wire code.
    pub fn code(self) -> u32 {
        match self {
            Self::Success => 0x00,
            Self::InvalidArgument => 0x40,
            Self::InvalidPin => 0x44,
            Self::ConfigFailed => 0x47,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x00 => Some(Self::Success),
            0x40 => Some(Self::InvalidArgument),
            0x44 => Some(Self::InvalidPin),
            0x47 => Some(Self::ConfigFailed),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::InvalidArgument => write!(f, "duration out of representable range"),
            Self::InvalidPin => write!(f, "pin cannot act as the required input"),
            Self::ConfigFailed => write!(f, "hardware configuration rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for status in [
            Status::Success,
            Status::InvalidArgument,
            Status::InvalidPin,
            Status::ConfigFailed,
        ] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(0xDEAD), None);
    }
}
