//! Consumption statistics over decoded samples.
//!
//! Samples are one minute apart, so energy is the sum of instantaneous power
//! divided by 60. A gap of more than one minute between consecutive samples
//! means the logger was unpowered: a blackout.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::models::PowerSample;

const SAMPLE_INTERVAL_MINUTES: i64 = 1;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Sort samples chronologically and drop duplicate timestamps.
///
/// Logs downloaded from the device overlap, so the same minute can appear in
/// several files.
pub fn prepare(samples: &mut Vec<PowerSample>) {
    samples.sort_by_key(|s| s.timestamp);
    samples.dedup_by_key(|s| s.timestamp);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerStats {
    /// kWh
    pub total_active_energy: f64,
    /// kW
    pub avg_active_power: f64,
    pub max_active_power: PowerSample,

    /// kVAh
    pub total_apparent_energy: f64,
    /// kVA
    pub avg_apparent_power: f64,
    pub max_apparent_power: PowerSample,

    pub min_voltage: PowerSample,
    pub max_voltage: PowerSample,
    /// V
    pub avg_voltage: f64,

    /// Time covered by the samples, counting the last sample's minute
    pub total_duration: Duration,
}

impl PowerStats {
    /// Returns `None` for an empty slice.
    pub fn compute(samples: &[PowerSample]) -> Option<Self> {
        let first = samples.first()?;
        let count = samples.len() as f64;

        let power_sum: f64 = samples.iter().map(|s| s.power).sum();
        let apparent_sum: f64 = samples.iter().map(|s| s.apparent_power).sum();
        let voltage_sum: f64 = samples.iter().map(|s| s.voltage).sum();

        let max_by = |key: fn(&PowerSample) -> f64| {
            *samples
                .iter()
                .max_by(|a, b| key(a).total_cmp(&key(b)))
                .unwrap_or(first)
        };
        let min_by = |key: fn(&PowerSample) -> f64| {
            *samples
                .iter()
                .min_by(|a, b| key(a).total_cmp(&key(b)))
                .unwrap_or(first)
        };

        let start = samples.iter().map(|s| s.timestamp).min()?;
        let end = samples.iter().map(|s| s.timestamp).max()?;

        Some(Self {
            total_active_energy: power_sum / 60.0,
            avg_active_power: power_sum / count,
            max_active_power: max_by(|s| s.power),
            total_apparent_energy: apparent_sum / 60.0,
            avg_apparent_power: apparent_sum / count,
            max_apparent_power: max_by(|s| s.apparent_power),
            min_voltage: min_by(|s| s.voltage),
            max_voltage: max_by(|s| s.voltage),
            avg_voltage: voltage_sum / count,
            total_duration: (end - start) + Duration::minutes(SAMPLE_INTERVAL_MINUTES),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DailyPowerInfo {
    pub date: NaiveDate,
    pub stats: PowerStats,
}

#[derive(Debug, Clone)]
pub struct OverallPowerInfo {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub stats: PowerStats,
    /// kWh per day, only when the samples span at least one day
    pub avg_daily_consumption: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerBlackout {
    /// First minute without a sample
    pub start: NaiveDateTime,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlackoutInfo {
    pub count: usize,
    pub total_duration: Duration,
    pub blackouts: Vec<PowerBlackout>,
}

/// Statistics over a chronologically sorted sample list (see [`prepare`]).
pub struct Statistics<'a> {
    samples: &'a [PowerSample],
}

impl<'a> Statistics<'a> {
    pub fn new(samples: &'a [PowerSample]) -> Self {
        Self { samples }
    }

    pub fn overall(&self) -> Option<OverallPowerInfo> {
        let stats = PowerStats::compute(self.samples)?;
        let start = self.samples.first()?.timestamp;
        let end = self.samples.last()?.timestamp;

        let span = end - start;
        let avg_daily_consumption = (span >= Duration::days(1))
            .then(|| stats.total_active_energy / (span.num_seconds() as f64 / SECONDS_PER_DAY));

        Some(OverallPowerInfo {
            start,
            end,
            stats,
            avg_daily_consumption,
        })
    }

    /// Per-day statistics in ascending date order.
    pub fn daily(&self) -> Vec<DailyPowerInfo> {
        self.samples
            .chunk_by(|a, b| a.timestamp.date() == b.timestamp.date())
            .filter_map(|day| {
                let stats = PowerStats::compute(day)?;
                Some(DailyPowerInfo {
                    date: day[0].timestamp.date(),
                    stats,
                })
            })
            .collect()
    }

    pub fn blackouts(&self) -> BlackoutInfo {
        let interval = Duration::minutes(SAMPLE_INTERVAL_MINUTES);
        let blackouts: Vec<PowerBlackout> = self
            .samples
            .windows(2)
            .filter_map(|pair| {
                let gap = pair[1].timestamp - pair[0].timestamp;
                (gap > interval).then(|| PowerBlackout {
                    start: pair[0].timestamp + interval,
                    duration: gap - interval,
                })
            })
            .collect();

        BlackoutInfo {
            count: blackouts.len(),
            total_duration: blackouts
                .iter()
                .fold(Duration::zero(), |sum, b| sum + b.duration),
            blackouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(day: u32, hour: u32, minute: u32, voltage: f64, current: f64) -> PowerSample {
        let timestamp = NaiveDate::from_ymd_opt(2023, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        PowerSample {
            index: 0,
            timestamp,
            voltage,
            current,
            power_factor: 1.0,
            power: voltage * current / 1000.0,
            apparent_power: voltage * current / 1000.0,
        }
    }

    #[test]
    fn test_prepare_sorts_and_dedups() {
        let mut samples = vec![
            sample(2, 0, 1, 230.0, 1.0),
            sample(1, 0, 0, 230.0, 1.0),
            sample(2, 0, 1, 231.0, 1.0),
        ];
        prepare(&mut samples);
        assert_eq!(samples.len(), 2);
        assert!(samples[0].timestamp < samples[1].timestamp);
    }

    #[test]
    fn test_power_stats() {
        let samples = vec![
            sample(1, 0, 0, 200.0, 3.0),
            sample(1, 0, 1, 240.0, 1.0),
            sample(1, 0, 2, 220.0, 2.0),
        ];
        let stats = PowerStats::compute(&samples).unwrap();
        assert!((stats.total_active_energy - 1.28 / 60.0).abs() < 1e-12);
        assert_eq!(stats.max_active_power.voltage, 200.0);
        assert_eq!(stats.min_voltage.voltage, 200.0);
        assert_eq!(stats.max_voltage.voltage, 240.0);
        assert!((stats.avg_voltage - 220.0).abs() < 1e-12);
        assert_eq!(stats.total_duration, Duration::minutes(3));
    }

    #[test]
    fn test_empty_samples() {
        let stats = Statistics::new(&[]);
        assert!(stats.overall().is_none());
        assert!(stats.daily().is_empty());
        assert_eq!(stats.blackouts().count, 0);
    }

    #[test]
    fn test_blackouts() {
        let samples = vec![
            sample(1, 10, 0, 230.0, 1.0),
            sample(1, 10, 1, 230.0, 1.0),
            sample(1, 10, 5, 230.0, 1.0),
            sample(1, 11, 0, 230.0, 1.0),
        ];
        let info = Statistics::new(&samples).blackouts();
        assert_eq!(info.count, 2);
        assert_eq!(info.blackouts[0].start.to_string(), "2023-06-01 10:02:00");
        assert_eq!(info.blackouts[0].duration, Duration::minutes(3));
        assert_eq!(info.blackouts[1].duration, Duration::minutes(54));
        assert_eq!(info.total_duration, Duration::minutes(57));
    }

    #[test]
    fn test_daily_and_overall() {
        let samples = vec![
            sample(1, 23, 59, 230.0, 1.0),
            sample(2, 0, 0, 230.0, 2.0),
            sample(3, 0, 0, 230.0, 2.0),
        ];
        let stats = Statistics::new(&samples);
        let daily = stats.daily();
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert_eq!(daily[1].stats.total_duration, Duration::minutes(1));

        let overall = stats.overall().unwrap();
        let per_day = overall.avg_daily_consumption.unwrap();
        let span_days = (24.0 * 60.0 + 1.0) / (24.0 * 60.0);
        assert!((per_day - overall.stats.total_active_energy / span_days).abs() < 1e-12);
    }
}
