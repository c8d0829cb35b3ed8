use anyhow::Result;
use std::io::Write;

use crate::models::PowerSample;

pub const HEADER: [&str; 6] = [
    "Timestamp",
    "Voltage (V)",
    "Current (A)",
    "cosPHI",
    "Active Power (kW)",
    "Apparent Power (kVA)",
];

pub fn write_history<W: Write>(writer: W, samples: &[PowerSample]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for s in samples {
        wtr.write_record(&[
            s.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            s.voltage.to_string(),
            s.current.to_string(),
            s.power_factor.to_string(),
            s.power.to_string(),
            s.apparent_power.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
