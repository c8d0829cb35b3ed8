//! Decoder configuration.

use std::ops::RangeInclusive;

/// What to do when a block does not start with the start marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop decoding. The error is returned when it hits the first block,
    /// otherwise the blocks before it are kept and the error is recorded in
    /// [`DecodedLog::stopped_by`](crate::DecodedLog::stopped_by).
    #[default]
    Abort,
    /// Scan forward to the next start marker and keep going.
    Resynchronize,
}

/// Options controlling how blocks are framed and checked.
///
/// # Examples
///
/// ```
/// use voltcraft_parser::{DecoderConfig, ErrorPolicy};
///
/// let config = DecoderConfig::builder()
///     .error_policy(ErrorPolicy::Resynchronize)
///     .voltage_range(180.0..=260.0)
///     .build();
/// assert!(config.split_on_start_marker);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    /// End the current block when a start marker shows up in place of a sample.
    pub split_on_start_marker: bool,
    pub error_policy: ErrorPolicy,
    /// Voltages outside this window raise a semantic warning.
    pub voltage_range: RangeInclusive<f64>,
    /// Warnings kept per block. Further implausible samples are only counted.
    pub max_warnings: usize,
}

impl DecoderConfig {
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::new()
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            split_on_start_marker: true,
            error_policy: ErrorPolicy::Abort,
            voltage_range: 150.0..=250.0,
            max_warnings: 32,
        }
    }
}

/// Builder for [`DecoderConfig`].
pub struct DecoderConfigBuilder {
    config: DecoderConfig,
}

impl DecoderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DecoderConfig::default(),
        }
    }

    pub fn split_on_start_marker(mut self, split: bool) -> Self {
        self.config.split_on_start_marker = split;
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    pub fn voltage_range(mut self, range: RangeInclusive<f64>) -> Self {
        self.config.voltage_range = range;
        self
    }

    pub fn max_warnings(mut self, max: usize) -> Self {
        self.config.max_warnings = max;
        self
    }

    pub fn build(self) -> DecoderConfig {
        self.config
    }
}

impl Default for DecoderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
