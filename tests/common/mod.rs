/// Test utilities for building Voltcraft log files
use byteorder::{BigEndian, WriteBytesExt};

pub const START_MARKER: [u8; 3] = [0xE0, 0xC5, 0xEA];
pub const END_MARKER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Builder for creating Voltcraft test logs
pub struct PowerLogBuilder {
    data: Vec<u8>,
}

#[allow(dead_code)]
impl PowerLogBuilder {
    /// Create an empty log
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Add a start marker and header. `year` is the two-digit year
    pub fn block(mut self, month: u8, day: u8, year: u8, hour: u8, minute: u8) -> Self {
        self.data.extend_from_slice(&START_MARKER);
        self.data.extend_from_slice(&[month, day, year, hour, minute]);
        self
    }

    /// Add a sample record from raw field values
    pub fn sample(mut self, voltage_raw: u16, current_raw: u16, power_factor_raw: u8) -> Self {
        self.data.write_u16::<BigEndian>(voltage_raw).unwrap();
        self.data.write_u16::<BigEndian>(current_raw).unwrap();
        self.data.push(power_factor_raw);
        self
    }

    /// Add `count` identical samples
    pub fn samples(mut self, count: usize, voltage_raw: u16, current_raw: u16, pf_raw: u8) -> Self {
        for _ in 0..count {
            self = self.sample(voltage_raw, current_raw, pf_raw);
        }
        self
    }

    /// Add the end marker
    pub fn end(mut self) -> Self {
        self.data.extend_from_slice(&END_MARKER);
        self
    }

    /// Append arbitrary bytes
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Get the built log bytes
    pub fn build(self) -> Vec<u8> {
        self.data
    }
}
