//! RANSAC configuration.
//!
//! [`RansacConfig`] holds every tunable parameter of the bad-channel detector.
//! All fields have defaults that match the values the method was published
//! with (PREP pipeline / autoreject).

use crate::error::{RansacError, Result};

/// Default seed used when none is given explicitly.
pub const DEFAULT_RANDOM_STATE: u64 = 435_656;

/// Configuration for [`Ransac`](crate::Ransac).
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use exg_ransac::RansacConfig;
///
/// let cfg = RansacConfig {
///     n_resample: 100,   // more resamples, smoother consensus
///     n_jobs:     4,     // score epochs on 4 threads
///     ..RansacConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RansacConfig {
    /// Number of random channel subsets drawn per fit.
    ///
    /// Default: `50`.
    pub n_resample: usize,

    /// Fraction of channels used to predict every channel.
    ///
    /// The subset size is `round(min_channels × n_channels)` with ties rounded
    /// to even, so 10 channels at 0.25 give subsets of 2.
    ///
    /// Default: `0.25`.
    pub min_channels: f64,

    /// Correlation below which a channel is RANSAC-bad in an epoch.
    ///
    /// Default: `0.75`.
    pub min_corr: f64,

    /// Fraction of epochs a channel may be RANSAC-bad before it is flagged.
    ///
    /// The comparison is strict: a channel is flagged when its bad count is
    /// greater than `unbroken_time × n_epochs`.
    ///
    /// Default: `0.4`.
    pub unbroken_time: f64,

    /// Number of worker threads used to score epochs.
    ///
    /// `1` scores inline.  Negative values count back from the number of
    /// cores: `-1` uses all cores, `-2` all but one, and so on.
    ///
    /// Default: `1`.
    pub n_jobs: i32,

    /// Seed for the subset sampler.  `None` draws a fresh seed from the OS.
    ///
    /// Default: `Some(435656)`.
    pub random_state: Option<u64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            n_resample: 50,
            min_channels: 0.25,
            min_corr: 0.75,
            unbroken_time: 0.4,
            n_jobs: 1,
            random_state: Some(DEFAULT_RANDOM_STATE),
        }
    }
}

impl RansacConfig {
    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<()> {
        if self.n_resample == 0 {
            return Err(RansacError::InvalidConfig("n_resample must be at least 1".into()));
        }
        if !(self.min_channels > 0.0 && self.min_channels <= 1.0) {
            return Err(RansacError::InvalidConfig(format!(
                "min_channels must be in (0, 1], got {}",
                self.min_channels
            )));
        }
        if !(0.0..=1.0).contains(&self.unbroken_time) {
            return Err(RansacError::InvalidConfig(format!(
                "unbroken_time must be in [0, 1], got {}",
                self.unbroken_time
            )));
        }
        if !self.min_corr.is_finite() {
            return Err(RansacError::InvalidConfig(format!(
                "min_corr must be finite, got {}",
                self.min_corr
            )));
        }
        if self.n_jobs == 0 {
            return Err(RansacError::InvalidConfig("n_jobs must be non-zero".into()));
        }
        Ok(())
    }

    /// Number of channels in each random subset for a recording of
    /// `n_channels` channels.
    ///
    /// # Examples
    ///
    /// ```
    /// use exg_ransac::RansacConfig;
    /// let cfg = RansacConfig::default();
    /// assert_eq!(cfg.subset_size(10), 2);  // 2.5 rounds to even
    /// assert_eq!(cfg.subset_size(64), 16);
    /// ```
    pub fn subset_size(&self, n_channels: usize) -> usize {
        (self.min_channels * n_channels as f64).round_ties_even() as usize
    }

    /// Resolve [`n_jobs`](Self::n_jobs) to a concrete thread count (≥ 1).
    pub fn effective_n_jobs(&self) -> usize {
        if self.n_jobs > 0 {
            return self.n_jobs as usize;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get() as i64)
            .unwrap_or(1);
        (cores + 1 + self.n_jobs as i64).max(1) as usize
    }
}
