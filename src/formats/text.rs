use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use std::io::Write;

use crate::models::PowerSample;
use crate::stats::{BlackoutInfo, DailyPowerInfo, OverallPowerInfo, PowerStats};

const MINUTE_FORMAT: &str = "[%Y-%m-%d %H:%M]";

fn stamp(ts: &NaiveDateTime) -> String {
    ts.format(MINUTE_FORMAT).to_string()
}

pub fn format_sample(s: &PowerSample) -> String {
    format!(
        "{} U={:.1}V I={:.3}A cosPHI={:.2} P={:.3}kW S={:.3}kVA",
        stamp(&s.timestamp),
        s.voltage,
        s.current,
        s.power_factor,
        s.power,
        s.apparent_power
    )
}

pub fn write_history<W: Write>(mut w: W, samples: &[PowerSample]) -> Result<()> {
    writeln!(w, "== PARAMETER HISTORY ==")?;
    writeln!(w)?;
    for s in samples {
        writeln!(w, "{}", format_sample(s))?;
    }
    w.flush()?;
    Ok(())
}

/// `DDd:HHh:MMm`, `HHh:MMm` or `MMm`, whichever is shortest.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds();
    let minutes = (secs / 60) % 60;
    let hours = (secs / 3600) % 24;
    let days = secs / 86_400;
    if days > 0 {
        format!("{:0>2}d:{:0>2}h:{:0>2}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{:0>2}h:{:0>2}m", hours, minutes)
    } else {
        format!("{:0>2}m", minutes)
    }
}

pub fn write_statistics<W: Write>(
    mut w: W,
    overall: &OverallPowerInfo,
    daily: &[DailyPowerInfo],
    blackouts: &BlackoutInfo,
) -> Result<()> {
    let stats = &overall.stats;

    writeln!(w, "==== OVERALL STATISTICS ==================")?;
    writeln!(
        w,
        "Interval: {}-{} ({})",
        stamp(&overall.start),
        stamp(&overall.end),
        format_duration(overall.end - overall.start)
    )?;
    if let Some(d) = overall.avg_daily_consumption {
        writeln!(
            w,
            "Average consumption: {:.2}kWh/day | Projected: {:.2}kWh/month or {:.2}kWh/year.",
            d,
            d * 30.0,
            d * 365.0
        )?;
    }
    writeln!(w)?;
    writeln!(w, "- ACTIVE POWER")?;
    writeln!(w, "Total energy consumption: {:.2}kWh.", stats.total_active_energy)?;
    writeln!(
        w,
        "Peak power was {:.2}kW and occurred on {}.",
        stats.max_active_power.power,
        stamp(&stats.max_active_power.timestamp)
    )?;
    writeln!(w, "Minute by minute average power: {:.2}kW.", stats.avg_active_power)?;
    writeln!(w)?;
    writeln!(w, "- APPARENT POWER")?;
    writeln!(w, "Total energy consumption: {:.2}kVAh.", stats.total_apparent_energy)?;
    writeln!(
        w,
        "Peak power was {:.2}kVA and occurred on {}.",
        stats.max_apparent_power.apparent_power,
        stamp(&stats.max_apparent_power.timestamp)
    )?;
    writeln!(w, "Minute by minute average power: {:.2}kVA.", stats.avg_apparent_power)?;
    writeln!(w)?;
    writeln!(w, "- VOLTAGE")?;
    writeln!(
        w,
        "Minimum voltage was {:.1}V and occurred on {}.",
        stats.min_voltage.voltage,
        stamp(&stats.min_voltage.timestamp)
    )?;
    writeln!(
        w,
        "Maximum voltage was {:.1}V and occurred on {}.",
        stats.max_voltage.voltage,
        stamp(&stats.max_voltage.timestamp)
    )?;
    writeln!(w, "Minute by minute average voltage: {:.1}V.", stats.avg_voltage)?;
    writeln!(w)?;
    writeln!(w)?;

    writeln!(w, "==== DAILY STATISTICS ====================")?;
    for day in daily {
        write_daily(&mut w, day)?;
    }
    writeln!(w)?;

    writeln!(w, "==== BLACKOUT HISTORY ====================")?;
    writeln!(
        w,
        "{} blackout(s) for a total of {}.",
        blackouts.count,
        format_duration(blackouts.total_duration)
    )?;
    writeln!(w)?;
    for b in &blackouts.blackouts {
        writeln!(w, "{} Duration: {}", stamp(&b.start), format_duration(b.duration))?;
    }
    w.flush()?;
    Ok(())
}

fn write_daily<W: Write>(w: &mut W, day: &DailyPowerInfo) -> Result<()> {
    let s: &PowerStats = &day.stats;
    writeln!(
        w,
        "{} - {} recorded activity ({:.1}%)",
        day.date.format("[%Y-%m-%d]"),
        format_duration(s.total_duration),
        s.total_duration.num_seconds() as f64 * 100.0 / 86_400.0
    )?;
    writeln!(
        w,
        "      Total active power: {:.2}kWh  | Average: {:.2}kW  | Maximum: {:.2}kW on {}",
        s.total_active_energy,
        s.avg_active_power,
        s.max_active_power.power,
        stamp(&s.max_active_power.timestamp)
    )?;
    writeln!(
        w,
        "    Total apparent power: {:.2}kVAh | Average: {:.2}kVA | Maximum: {:.2}kVA on {}",
        s.total_apparent_energy,
        s.avg_apparent_power,
        s.max_apparent_power.apparent_power,
        stamp(&s.max_apparent_power.timestamp)
    )?;
    writeln!(
        w,
        "    Voltage: Average: {:.1}V | Minimum: {:.1}V on {} | Maximum: {:.1}V on {}",
        s.avg_voltage,
        s.min_voltage.voltage,
        stamp(&s.min_voltage.timestamp),
        s.max_voltage.voltage,
        stamp(&s.max_voltage.timestamp)
    )?;
    writeln!(w)?;
    Ok(())
}
