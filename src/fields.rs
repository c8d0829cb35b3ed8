//! Field-level decoding of Voltcraft records.
//!
//! Every function here is total over its byte input. Whether a decoded value
//! makes sense (a real calendar date, a plausible mains voltage) is decided by
//! the block parser, not here.
//!
//! Multi-byte fields are big-endian: `09 C4` decodes to 2500.

use byteorder::{BigEndian, ByteOrder};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the block header (month, day, year, hour, minute).
pub const HEADER_LEN: usize = 5;
/// Size of one power sample record.
pub const SAMPLE_LEN: usize = 5;

const YEAR_BASE: u16 = 2000;
const VOLTAGE_DIVISOR: f64 = 10.0;
const CURRENT_DIVISOR: f64 = 1000.0;
const POWER_FACTOR_DIVISOR: f64 = 100.0;

/// Raw block start time as stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockStartTime {
    pub month: u8,
    pub day: u8,
    pub year: u16,
    pub hour: u8,
    pub minute: u8,
}

impl BlockStartTime {
    /// Converts the header into a calendar timestamp.
    ///
    /// Returns `None` when the fields do not name a real date and time
    /// (month 13, February 30, minute 60, ...).
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_opt(self.hour as u32, self.minute as u32, 0)
    }

    /// Timestamp of the sample at `index` in a block starting at `base`.
    ///
    /// Returns `None` once the offset leaves chrono's representable range.
    pub fn sample_time(base: NaiveDateTime, index: u64) -> Option<NaiveDateTime> {
        let minutes = i64::try_from(index).ok()?;
        base.checked_add_signed(Duration::try_minutes(minutes)?)
    }
}

impl fmt::Display for BlockStartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

/// One undecoded sample record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPowerSample {
    pub voltage_raw: u16,
    pub current_raw: u16,
    pub power_factor_raw: u8,
}

impl RawPowerSample {
    pub fn voltage(&self) -> f64 {
        scale_voltage(self.voltage_raw)
    }

    pub fn current(&self) -> f64 {
        scale_current(self.current_raw)
    }

    pub fn power_factor(&self) -> f64 {
        scale_power_factor(self.power_factor_raw)
    }

    /// Active power in kW.
    pub fn power(&self) -> f64 {
        active_power(self.voltage(), self.current(), self.power_factor())
    }

    /// Apparent power in kVA.
    pub fn apparent_power(&self) -> f64 {
        apparent_power(self.voltage(), self.current())
    }
}

pub fn decode_date(bytes: [u8; HEADER_LEN]) -> BlockStartTime {
    BlockStartTime {
        month: bytes[0],
        day: bytes[1],
        year: YEAR_BASE + decode_u8(bytes[2]) as u16,
        hour: bytes[3],
        minute: bytes[4],
    }
}

pub fn decode_u16(bytes: [u8; 2]) -> u16 {
    BigEndian::read_u16(&bytes)
}

pub fn decode_u8(byte: u8) -> u8 {
    byte
}

pub fn decode_sample(bytes: [u8; SAMPLE_LEN]) -> RawPowerSample {
    RawPowerSample {
        voltage_raw: decode_u16([bytes[0], bytes[1]]),
        current_raw: decode_u16([bytes[2], bytes[3]]),
        power_factor_raw: decode_u8(bytes[4]),
    }
}

/// Volts.
pub fn scale_voltage(raw: u16) -> f64 {
    raw as f64 / VOLTAGE_DIVISOR
}

/// Amperes.
pub fn scale_current(raw: u16) -> f64 {
    raw as f64 / CURRENT_DIVISOR
}

/// cos(phi), 0.00 to 1.00 on a healthy device.
pub fn scale_power_factor(raw: u8) -> f64 {
    raw as f64 / POWER_FACTOR_DIVISOR
}

// Derived quantities are always computed from the scaled fields in this order,
// so a consumer re-deriving them from a PowerSample gets bit-identical values.
pub fn active_power(voltage: f64, current: f64, power_factor: f64) -> f64 {
    voltage * current * power_factor / 1000.0
}

pub fn apparent_power(voltage: f64, current: f64) -> f64 {
    voltage * current / 1000.0
}
