//! Per-epoch consensus correlation.
//!
//! For an epoch `X` ([C, T]) and stacked operator `S` ([R·C, C]):
//!
//! 1. `Y = S · X` gives `[R·C, T]`; row `r·C + c` is channel `c` predicted
//!    from subset `r`.
//! 2. View `Y` as `[R, C, T]` and take the median over `R`.  For even `R`
//!    this is the mean of the two middle values.
//! 3. Per channel, `corr = Σ x·p / (‖x‖ ‖p‖)` over time.  This is not
//!    mean-centred.  A channel with zero energy gives `NaN`.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::Result;
use crate::operator::StackedOperator;

/// Median of `values`.  Any `NaN` makes the result `NaN`.
pub fn median(values: ArrayView1<'_, f64>) -> f64 {
    let mut v: Vec<f64> = values.to_vec();
    if v.is_empty() || v.iter().any(|x| x.is_nan()) {
        return f64::NAN;
    }
    v.sort_unstable_by(f64::total_cmp);
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        (v[n / 2 - 1] + v[n / 2]) / 2.0
    }
}

/// Median-pooled prediction `[C, T]` of one epoch.
pub fn predict(data: ArrayView2<'_, f64>, op: &StackedOperator) -> Result<Array2<f64>> {
    let (n_ch, n_times) = data.dim();
    let stacked = op.matrix().dot(&data);
    let per_resample = stacked.into_shape_with_order((op.n_resample(), n_ch, n_times))?;
    Ok(per_resample.map_axis(Axis(0), median))
}

/// Correlation between each channel and its consensus prediction.
pub fn compute_correlations(data: ArrayView2<'_, f64>, op: &StackedOperator) -> Result<Array1<f64>> {
    let y_pred = predict(data, op)?;
    let corr = data
        .outer_iter()
        .zip(y_pred.outer_iter())
        .map(|(x, p)| {
            let num = x.dot(&p);
            let denom = x.dot(&x).sqrt() * p.dot(&p).sqrt();
            num / denom
        })
        .collect();
    Ok(corr)
}
