//! Stacked RANSAC prediction operators.
//!
//! For each channel subset `s` the kernel gives weights `[C, |s|]` predicting
//! every channel from the channels in `s`.  They are scattered into the
//! columns `s` of a zeroed `[C, C]` matrix, and the `R` matrices are stacked
//! row-wise into one `[R·C, C]` operator:
//!
//! ```text
//! rows r·C .. (r+1)·C  =  operator of subset r
//! ```
use ndarray::{s, Array2, ArrayView2};

use crate::epoch::Epochs;
use crate::error::Result;
use crate::kernel::Predictor;

/// All per-subset operators, stacked.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedOperator {
    matrix: Array2<f64>,
    n_resample: usize,
    n_channels: usize,
}

impl StackedOperator {
    /// The full `[R·C, C]` matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn n_resample(&self) -> usize {
        self.n_resample
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// The `[C, C]` operator of subset `r`.
    pub fn block(&self, r: usize) -> ArrayView2<'_, f64> {
        let c = self.n_channels;
        self.matrix.slice(s![r * c..(r + 1) * c, ..])
    }
}

/// Build the stacked operator for `subsets` over all channels of `epochs`.
///
/// Subset order is kept as drawn; column `k` of a subset's weights lands in
/// column `subset[k]`.
pub fn build_mappings(
    epochs: &Epochs,
    subsets: &[Vec<usize>],
    predictor: &Predictor,
) -> Result<StackedOperator> {
    let n_channels = epochs.n_channels();
    let pick_to: Vec<usize> = (0..n_channels).collect();
    let mut matrix = Array2::<f64>::zeros((subsets.len() * n_channels, n_channels));

    for (r, pick_from) in subsets.iter().enumerate() {
        let weights = predictor.weights(epochs, pick_from, &pick_to)?;
        let mut block = matrix.slice_mut(s![r * n_channels..(r + 1) * n_channels, ..]);
        for (k, &col) in pick_from.iter().enumerate() {
            block.column_mut(col).assign(&weights.column(k));
        }
    }

    Ok(StackedOperator { matrix, n_resample: subsets.len(), n_channels })
}
