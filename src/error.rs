//! Error type for the RANSAC pipeline.
//!
//! Structural and configuration problems abort `fit` before any sampling
//! happens.  Numerical degeneracies (zero-energy channels) are *not* errors:
//! they surface as `NaN` correlations and are counted as bad.
use thiserror::Error;

use crate::info::SensorFamily;

#[derive(Debug, Error)]
pub enum RansacError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid data shape: {0}")]
    InvalidShape(String),

    #[error("got mixed channel types; pick either eeg or meg but not both")]
    MixedSensorTypes,

    #[error("invalid channel types present in epochs, expected ONLY meg or ONLY eeg; got {}", .0.join(", "))]
    InvalidSensorTypes(Vec<String>),

    #[error("no eeg or meg channels present")]
    NoSensors,

    #[error("meg channels require a field mapper; none was configured")]
    MissingFieldMapper,

    #[error("invalid channel position for {channel}: {reason}")]
    InvalidPositions { channel: String, reason: String },

    #[error("min_channels = {min_channels} selects 0 of {n_channels} channels")]
    EmptySubset { min_channels: f64, n_channels: usize },

    #[error("model is not fitted; call fit() before transform()")]
    NotFitted,

    #[error("model was fitted on {fitted:?} channels, got {got:?}")]
    SensorFamilyMismatch { fitted: SensorFamily, got: SensorFamily },

    #[error("interpolation kernel failed: {0}")]
    Kernel(String),

    #[error("bad channel repair failed: {0}")]
    Repair(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, RansacError>;
