//! # exg-ransac — RANSAC bad-channel detection for EEG/MEG in pure Rust
//!
//! `exg-ransac` finds and repairs broken sensors in epoched recordings with
//! the RANSAC method of the PREP pipeline (Bigdely-Shamlo et al., 2015), in
//! the form used by autoreject (Jas et al., 2017).  Every channel is predicted
//! from many random subsets of the other channels; a channel whose actual
//! signal disagrees with the consensus prediction in too many epochs is bad.
//!
//! ## Pipeline overview
//!
//! ```text
//! Epochs [E, C, T] + channel positions
//!   │
//!   ├─ sampler::random_subsets     n_resample × round(min_channels · C) channels
//!   ├─ operator::build_mappings    spherical splines → [R·C, C] operator
//!   ├─ scorer (per epoch, n_jobs)  median-pooled prediction, cosine corr
//!   ├─ aggregate                   corr < min_corr in > unbroken_time of epochs
//!   │
//!   └─→ bad_chs  ──→ repair::InterpolateBads  ──→ cleaned Epochs
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use exg_ransac::{Epochs, Info, Ransac, RansacConfig};
//! use ndarray::{Array2, Array3};
//!
//! let names: Vec<String> = (0..32).map(|i| format!("EEG{i:03}")).collect();
//! // metres, head-centred
//! let pos = Array2::from_shape_fn((32, 3), |(i, k)| {
//!     let th = i as f64 * 0.2;
//!     [0.08 * th.cos(), 0.08 * th.sin(), 0.05][k]
//! });
//! let info = Info::from_eeg_positions(&names, &pos, 256.0).unwrap();
//! let data = Array3::from_shape_fn((40, 32, 256), |(e, c, t)| {
//!     (0.05 * t as f64 + e as f64).sin() * (1.0 + 0.01 * c as f64)
//! });
//! let epochs = Epochs::new(data, info).unwrap();
//!
//! let mut ransac = Ransac::new(RansacConfig::default());
//! let cleaned = ransac.fit_transform(&epochs).unwrap();
//! println!("bad channels: {:?}", ransac.bad_chs().unwrap());
//! assert_eq!(cleaned.n_channels(), 32);
//! ```
//!
//! ## MEG
//!
//! MEG predictions come from a forward model, which this crate does not
//! compute.  Implement [`FieldMapper`] and pass it with
//! [`Ransac::with_field_mapper`].

pub mod aggregate;
pub mod config;
pub mod epoch;
pub mod error;
pub mod info;
pub mod io;
pub mod kernel;
pub mod operator;
pub mod parallel;
pub mod ransac;
pub mod repair;
pub mod sampler;
pub mod scorer;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use config::{RansacConfig, DEFAULT_RANDOM_STATE};
pub use epoch::{epoch, Epochs};
pub use error::RansacError;
pub use info::{ChannelInfo, ChannelKind, Info, SensorFamily};
pub use kernel::{FieldMapper, InterpolationKernel, Predictor, SphericalSpline, INTERPOLATION_ALPHA};
pub use operator::{build_mappings, StackedOperator};
pub use ransac::{FittedRansac, Ransac, RansacState};
pub use repair::{InterpolateBads, RepairBads};

/// Detect bad channels in `epochs` with `cfg`, returning their names in
/// channel order.
///
/// Shorthand for `Ransac::new(cfg).fit(epochs)?.bad_chs()`.
pub fn find_bad_channels(epochs: &Epochs, cfg: &RansacConfig) -> Result<Vec<String>, RansacError> {
    let mut ransac = Ransac::new(cfg.clone());
    ransac.fit(epochs)?;
    Ok(ransac.bad_chs()?.to_vec())
}
