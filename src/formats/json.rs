use anyhow::Result;
use std::io::Write;

use crate::models::PowerSample;

pub fn write_history<W: Write>(mut writer: W, samples: &[PowerSample]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, samples)?;
    writer.flush()?;
    Ok(())
}
