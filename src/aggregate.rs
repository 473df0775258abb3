//! Thresholding of the correlation matrix into a bad-channel list.
//!
//! `corr` is `[E, C]`.  An entry is RANSAC-bad when it is below `min_corr`
//! or `NaN` (a channel with no energy cannot be predicted).  A channel is
//! flagged when its bad count is strictly greater than
//! `unbroken_time × E`.
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// `[E, C]` indicator of RANSAC-bad epochs per channel.
pub fn bad_log(corr: ArrayView2<'_, f64>, min_corr: f64) -> Array2<u8> {
    corr.mapv(|c| u8::from(c.is_nan() || c < min_corr))
}

/// Number of bad epochs per channel.
pub fn bad_tally(bad_log: &Array2<u8>) -> Array1<usize> {
    bad_log.map_axis(Axis(0), |col| col.iter().map(|&b| b as usize).sum::<usize>())
}

/// Indices (in channel order) of channels whose tally exceeds
/// `unbroken_time × n_epochs`.
pub fn bad_channel_indices(tally: &Array1<usize>, n_epochs: usize, unbroken_time: f64) -> Vec<usize> {
    let limit = unbroken_time * n_epochs as f64;
    tally
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n as f64 > limit)
        .map(|(i, _)| i)
        .collect()
}

/// Full classification: indices of bad channels for a `[E, C]` matrix.
pub fn classify(corr: ArrayView2<'_, f64>, min_corr: f64, unbroken_time: f64) -> Vec<usize> {
    let log = bad_log(corr, min_corr);
    bad_channel_indices(&bad_tally(&log), corr.nrows(), unbroken_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nan_counts_as_bad() {
        let corr = array![[0.9, f64::NAN], [0.9, 0.95]];
        let log = bad_log(corr.view(), 0.75);
        assert_eq!(log, array![[0u8, 1], [0, 0]]);
    }

    #[test]
    fn threshold_is_strict() {
        // 4 of 10 epochs bad with unbroken_time 0.4 → 4 > 4 is false.
        let corr = Array2::from_shape_fn((10, 2), |(e, c)| if c == 1 && e < 4 { 0.1 } else { 0.9 });
        assert!(classify(corr.view(), 0.75, 0.4).is_empty());
        // one more bad epoch tips it over.
        let corr = Array2::from_shape_fn((10, 2), |(e, c)| if c == 1 && e < 5 { 0.1 } else { 0.9 });
        assert_eq!(classify(corr.view(), 0.75, 0.4), vec![1]);
    }

    #[test]
    fn full_unbroken_time_needs_every_epoch_bad_and_then_some() {
        let corr = Array2::from_shape_fn((8, 3), |(e, c)| if e < 7 { -1.0 } else { c as f64 });
        assert!(classify(corr.view(), 0.75, 1.0).is_empty());
    }

    #[test]
    fn output_is_in_channel_order() {
        let corr = array![[0.1, 0.9, 0.1, 0.0], [0.1, 0.9, 0.2, 0.0]];
        assert_eq!(classify(corr.view(), 0.75, 0.4), vec![0, 2, 3]);
    }

    #[test]
    fn tally_counts_columns() {
        let log = array![[1u8, 0, 1], [1, 0, 0], [0, 0, 1]];
        assert_eq!(bad_tally(&log), array![2usize, 0, 2]);
    }
}
