//! The RANSAC bad-channel detector.
//!
//! ```text
//! fit(epochs)
//!   ├─ validate config + data, resolve sensor family (eeg | meg)
//!   ├─ sampler::random_subsets      n_resample subsets, one seeded RNG
//!   ├─ operator::build_mappings     [R·C, C] stacked operator (Arc, read-only)
//!   ├─ parallel::run_chunks         per-chunk scorer::compute_correlations
//!   └─ aggregate                    bad_log → tally → bad_chs
//!
//! transform(epochs) → copy with info.bads = bad_chs, bad channels repaired
//! ```
//!
//! # Example
//!
//! ```no_run
//! use exg_ransac::{Epochs, Ransac, RansacConfig};
//! # fn load() -> Epochs { unimplemented!() }
//!
//! let epochs = load();
//! let mut ransac = Ransac::new(RansacConfig { n_jobs: 4, ..Default::default() });
//! let cleaned = ransac.fit_transform(&epochs)?;
//! println!("bad channels: {:?}", ransac.bad_chs()?);
//! # Ok::<(), exg_ransac::RansacError>(())
//! ```
use std::sync::Arc;

use ndarray::{concatenate, Array2, Axis};
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::config::RansacConfig;
use crate::epoch::Epochs;
use crate::error::{RansacError, Result};
use crate::info::SensorFamily;
use crate::kernel::{FieldMapper, InterpolationKernel, Predictor, SphericalSpline};
use crate::operator::{build_mappings, StackedOperator};
use crate::parallel::{array_split, run_chunks};
use crate::repair::{InterpolateBads, RepairBads};
use crate::sampler::{make_rng, random_subsets};
use crate::scorer::compute_correlations;

/// Everything a fit produces.
#[derive(Debug, Clone)]
pub struct FittedRansac {
    pub family: SensorFamily,
    /// Channel indices of each random subset, in drawn order.
    pub picks: Vec<Vec<usize>>,
    /// Channel names of each random subset, in drawn order.
    pub ch_subsets: Vec<Vec<String>>,
    /// Shared `[R·C, C]` operator.
    pub mappings: Arc<StackedOperator>,
    /// `[E, C]` consensus correlations.
    pub corr: Array2<f64>,
    /// `[E, C]` 1 where the channel is RANSAC-bad in that epoch.
    pub bad_log: Array2<u8>,
    /// Flagged channels, in channel order.
    pub bad_chs: Vec<String>,
    predictor: Predictor,
}

#[derive(Debug, Clone, Default)]
pub enum RansacState {
    #[default]
    Unfit,
    Fitted(Box<FittedRansac>),
}

/// RANSAC detector.  See the [module docs](self).
#[derive(Clone)]
pub struct Ransac {
    pub config: RansacConfig,
    spline: Arc<dyn InterpolationKernel>,
    field_mapper: Option<Arc<dyn FieldMapper>>,
    repair: Arc<dyn RepairBads>,
    state: RansacState,
}

impl std::fmt::Debug for Ransac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ransac")
            .field("config", &self.config)
            .field("has_field_mapper", &self.field_mapper.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl Default for Ransac {
    fn default() -> Self {
        Self::new(RansacConfig::default())
    }
}

impl Ransac {
    pub fn new(config: RansacConfig) -> Self {
        Self {
            config,
            spline: Arc::new(SphericalSpline::default()),
            field_mapper: None,
            repair: Arc::new(InterpolateBads::default()),
            state: RansacState::Unfit,
        }
    }

    /// Use a different geometric kernel for EEG.
    pub fn with_interpolation_kernel(mut self, kernel: Arc<dyn InterpolationKernel>) -> Self {
        self.spline = kernel;
        self
    }

    /// Field mapper used for MEG recordings.
    pub fn with_field_mapper(mut self, mapper: Arc<dyn FieldMapper>) -> Self {
        self.field_mapper = Some(mapper);
        self
    }

    /// Repair step used by [`transform`](Self::transform).
    pub fn with_repair(mut self, repair: Arc<dyn RepairBads>) -> Self {
        self.repair = repair;
        self
    }

    pub fn state(&self) -> &RansacState {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, RansacState::Fitted(_))
    }

    pub fn fitted(&self) -> Result<&FittedRansac> {
        match &self.state {
            RansacState::Fitted(f) => Ok(f),
            RansacState::Unfit => Err(RansacError::NotFitted),
        }
    }

    pub fn bad_chs(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.bad_chs)
    }

    pub fn corr(&self) -> Result<&Array2<f64>> {
        Ok(&self.fitted()?.corr)
    }

    /// Detect bad channels in `epochs`.  Refitting discards the previous fit.
    pub fn fit(&mut self, epochs: &Epochs) -> Result<&mut Self> {
        self.config.validate()?;
        epochs.check_shape()?;
        let family = epochs.info.sensor_family()?;
        if family == SensorFamily::Eeg {
            epochs.info.check_positions()?;
        }
        let predictor = Predictor::for_family(family, &self.spline, self.field_mapper.as_ref())?;

        let n_epochs = epochs.n_epochs();
        let n_channels = epochs.n_channels();
        let n_samples = self.config.subset_size(n_channels);
        if n_samples == 0 {
            return Err(RansacError::EmptySubset {
                min_channels: self.config.min_channels,
                n_channels,
            });
        }

        let mut rng = make_rng(self.config.random_state);
        let picks = random_subsets(&mut rng, n_channels, n_samples, self.config.n_resample);
        debug!(n_resample = picks.len(), n_samples, n_channels, "drew channel subsets");

        let mappings = Arc::new(build_mappings(epochs, &picks, &predictor)?);
        debug!(shape = ?mappings.matrix().dim(), "built stacked operator");

        let n_jobs = self.config.effective_n_jobs().min(n_epochs);
        let chunks = array_split(n_epochs, n_jobs);
        let parts = run_chunks(n_jobs, &chunks, |range| {
            let mut corrs = Array2::<f64>::zeros((range.len(), n_channels));
            for (row, e) in range.clone().enumerate() {
                corrs.row_mut(row).assign(&compute_correlations(epochs.epoch(e), &mappings)?);
            }
            debug!(start = range.start, end = range.end, "scored epoch chunk");
            Ok(corrs)
        })?;
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        let corr = concatenate(Axis(0), &views)?;

        let n_nan = corr.iter().filter(|c| c.is_nan()).count();
        if n_nan > 0 {
            warn!(n_nan, "zero-energy channels produced NaN correlations; counted as bad");
        }

        let bad_log = aggregate::bad_log(corr.view(), self.config.min_corr);
        let tally = aggregate::bad_tally(&bad_log);
        let bad_idx = aggregate::bad_channel_indices(&tally, n_epochs, self.config.unbroken_time);
        let bad_chs: Vec<String> = bad_idx.iter().map(|&i| epochs.info.chs[i].name.clone()).collect();
        info!(n_epochs, n_channels, n_jobs, bad_chs = ?bad_chs, "ransac fit done");

        let ch_subsets = picks
            .iter()
            .map(|p| p.iter().map(|&i| epochs.info.chs[i].name.clone()).collect())
            .collect();

        self.state = RansacState::Fitted(Box::new(FittedRansac {
            family,
            picks,
            ch_subsets,
            mappings,
            corr,
            bad_log,
            bad_chs,
            predictor,
        }));
        Ok(self)
    }

    /// Mark the fitted bad channels on a copy of `epochs` and repair them.
    pub fn transform(&self, epochs: &Epochs) -> Result<Epochs> {
        let fitted = self.fitted()?;
        epochs.check_shape()?;
        let family = epochs.info.sensor_family()?;
        if family != fitted.family {
            return Err(RansacError::SensorFamilyMismatch { fitted: fitted.family, got: family });
        }
        let mut marked = epochs.clone();
        marked.info.bads = fitted.bad_chs.clone();
        self.repair.repair(&marked, &fitted.predictor)
    }

    pub fn fit_transform(&mut self, epochs: &Epochs) -> Result<Epochs> {
        self.fit(epochs)?.transform(epochs)
    }
}
