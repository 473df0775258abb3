//! Channel metadata (MNE's `Info`, reduced to what RANSAC needs).
//!
//! Each channel carries a name, a kind and a 3-D position in metres.  The
//! set of kinds present decides which predictor a fit uses: EEG channels are
//! interpolated geometrically, MEG channels (magnetometers and gradiometers)
//! go through a field mapper.
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::error::{RansacError, Result};

// ── Channel kinds ─────────────────────────────────────────────────────────

/// Kind of a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Eeg,
    /// MEG magnetometer.
    Mag,
    /// MEG planar gradiometer.
    Grad,
    /// Anything else (`eog`, `ecg`, `stim`, `misc`, …), kept by name.
    Other(String),
}

impl ChannelKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChannelKind::Eeg => "eeg",
            ChannelKind::Mag => "mag",
            ChannelKind::Grad => "grad",
            ChannelKind::Other(s) => s,
        }
    }

    pub fn is_meg(&self) -> bool {
        matches!(self, ChannelKind::Mag | ChannelKind::Grad)
    }
}

impl FromStr for ChannelKind {
    type Err = std::convert::Infallible;

    /// Case-insensitive; unknown names become [`ChannelKind::Other`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "eeg" => ChannelKind::Eeg,
            "mag" => ChannelKind::Mag,
            "grad" => ChannelKind::Grad,
            other => ChannelKind::Other(other.to_string()),
        })
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor family of a whole recording.  A fit runs on exactly one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFamily {
    Eeg,
    Meg,
}

// ── Channel info ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub name: String,
    pub kind: ChannelKind,
    /// Sensor position `[x, y, z]` in metres.
    pub loc: [f64; 3],
}

impl ChannelInfo {
    pub fn new(name: impl Into<String>, kind: ChannelKind, loc: [f64; 3]) -> Self {
        Self { name: name.into(), kind, loc }
    }

    pub fn eeg(name: impl Into<String>, loc: [f64; 3]) -> Self {
        Self::new(name, ChannelKind::Eeg, loc)
    }
}

// ── Measurement info ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub chs: Vec<ChannelInfo>,
    /// Names of channels marked bad.
    pub bads: Vec<String>,
    /// Sampling rate in Hz (informational).
    pub sfreq: f64,
}

impl Info {
    pub fn new(chs: Vec<ChannelInfo>, sfreq: f64) -> Self {
        Self { chs, bads: vec![], sfreq }
    }

    /// Build an all-EEG `Info` from names and a `[C, 3]` position array.
    pub fn from_eeg_positions(names: &[String], pos: &Array2<f64>, sfreq: f64) -> Result<Self> {
        if pos.nrows() != names.len() || pos.ncols() != 3 {
            return Err(RansacError::InvalidShape(format!(
                "positions must be [{}, 3], got {:?}",
                names.len(),
                pos.dim()
            )));
        }
        let chs = names
            .iter()
            .zip(pos.rows())
            .map(|(n, p)| ChannelInfo::eeg(n.clone(), [p[0], p[1], p[2]]))
            .collect();
        Ok(Self::new(chs, sfreq))
    }

    pub fn n_chan(&self) -> usize {
        self.chs.len()
    }

    /// Channel names in order.
    pub fn ch_names(&self) -> Vec<&str> {
        self.chs.iter().map(|c| c.name.as_str()).collect()
    }

    /// Index of the channel called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.chs.iter().position(|c| c.name == name)
    }

    /// Positions of the channels at `picks` as a `[picks.len(), 3]` array.
    pub fn positions(&self, picks: &[usize]) -> Array2<f64> {
        Array2::from_shape_fn((picks.len(), 3), |(i, k)| self.chs[picks[i]].loc[k])
    }

    /// Every position must be finite and away from the origin; geometric
    /// interpolation projects positions onto the unit sphere.
    pub fn check_positions(&self) -> Result<()> {
        for ch in &self.chs {
            let norm = ch.loc.iter().map(|v| v * v).sum::<f64>().sqrt();
            if !norm.is_finite() || norm == 0.0 {
                return Err(RansacError::InvalidPositions {
                    channel: ch.name.clone(),
                    reason: format!("{:?} cannot be projected onto the sphere", ch.loc),
                });
            }
        }
        Ok(())
    }

    /// Resolve the recording's sensor family.
    ///
    /// Only `eeg`, `mag` and `grad` channels are accepted, and EEG may not be
    /// mixed with MEG.
    pub fn sensor_family(&self) -> Result<SensorFamily> {
        let mut invalid: Vec<String> = vec![];
        for ch in &self.chs {
            if let ChannelKind::Other(k) = &ch.kind {
                if !invalid.contains(k) {
                    invalid.push(k.clone());
                }
            }
        }
        if !invalid.is_empty() {
            return Err(RansacError::InvalidSensorTypes(invalid));
        }

        let has_eeg = self.chs.iter().any(|c| c.kind == ChannelKind::Eeg);
        let has_meg = self.chs.iter().any(|c| c.kind.is_meg());
        match (has_eeg, has_meg) {
            (true, true) => Err(RansacError::MixedSensorTypes),
            (true, false) => Ok(SensorFamily::Eeg),
            (false, true) => Ok(SensorFamily::Meg),
            (false, false) => Err(RansacError::NoSensors),
        }
    }
}
