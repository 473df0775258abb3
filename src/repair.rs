//! Bad-channel repair.
//!
//! [`InterpolateBads`] overwrites every channel listed in `info.bads` with a
//! prediction from the remaining channels, in every epoch, using the same
//! [`Predictor`] the RANSAC fit used.  Matches MNE's
//! `epochs.interpolate_bads(reset_bads=True)` for EEG when the predictor is a
//! spherical spline.
use ndarray::Axis;
use tracing::debug;

use crate::epoch::Epochs;
use crate::error::{RansacError, Result};
use crate::kernel::Predictor;

/// Replaces the signals of bad channels.
pub trait RepairBads: Send + Sync {
    /// Return a repaired copy of `epochs`.  `epochs` itself is untouched.
    fn repair(&self, epochs: &Epochs, predictor: &Predictor) -> Result<Epochs>;
}

/// Interpolate bad channels from good ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolateBads {
    /// Clear `info.bads` after repairing.  Default `true`.
    pub reset_bads: bool,
}

impl Default for InterpolateBads {
    fn default() -> Self {
        Self { reset_bads: true }
    }
}

impl RepairBads for InterpolateBads {
    fn repair(&self, epochs: &Epochs, predictor: &Predictor) -> Result<Epochs> {
        let mut out = epochs.clone();
        let info = &epochs.info;

        let mut bads = Vec::with_capacity(info.bads.len());
        for name in &info.bads {
            let idx = info
                .index_of(name)
                .ok_or_else(|| RansacError::Repair(format!("bad channel {name} not in info")))?;
            if !bads.contains(&idx) {
                bads.push(idx);
            }
        }
        if bads.is_empty() {
            return Ok(out);
        }
        let goods: Vec<usize> = (0..info.n_chan()).filter(|i| !bads.contains(i)).collect();
        if goods.is_empty() {
            return Err(RansacError::Repair("all channels are bad".into()));
        }
        debug!(n_bads = bads.len(), n_goods = goods.len(), "interpolating bad channels");

        let weights = predictor.weights(epochs, &goods, &bads)?;
        for (mut dst, src) in out
            .data_mut()
            .axis_iter_mut(Axis(0))
            .zip(epochs.data().axis_iter(Axis(0)))
        {
            let good_data = src.select(Axis(0), &goods);
            let repaired = weights.dot(&good_data);
            for (k, &b) in bads.iter().enumerate() {
                dst.row_mut(b).assign(&repaired.row(k));
            }
        }

        if self.reset_bads {
            out.info.bads.clear();
        }
        Ok(out)
    }
}
