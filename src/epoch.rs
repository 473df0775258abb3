//! Epoched recordings.
//!
//! [`Epochs`] pairs an `[E, C, T]` data array with its channel [`Info`].
//! It can be built from an existing 3-D array, from a list of `[C, T]`
//! segments, or by cutting a continuous `[C, T]` recording into
//! non-overlapping windows of `epoch_samples` samples (trailing samples that
//! don't fill a complete window are dropped).
use ndarray::{s, Array2, Array3, ArrayView2};

use crate::error::{RansacError, Result};
use crate::info::Info;

#[derive(Debug, Clone, PartialEq)]
pub struct Epochs {
    data: Array3<f64>,
    pub info: Info,
}

impl Epochs {
    /// Wrap an `[E, C, T]` array.  Fails if the channel axis doesn't match
    /// `info` or if any axis is empty.
    pub fn new(data: Array3<f64>, info: Info) -> Result<Self> {
        let epochs = Self { data, info };
        epochs.check_shape()?;
        Ok(epochs)
    }

    /// Re-check the data against `info`.  `info` is public and may have been
    /// edited since construction.
    pub fn check_shape(&self) -> Result<()> {
        let (n_e, n_c, n_t) = self.data.dim();
        if n_c != self.info.n_chan() {
            return Err(RansacError::InvalidShape(format!(
                "data has {n_c} channels but info lists {}",
                self.info.n_chan()
            )));
        }
        if n_e == 0 || n_c == 0 || n_t == 0 {
            return Err(RansacError::InvalidShape(format!(
                "epochs must be non-empty, got [{n_e}, {n_c}, {n_t}]"
            )));
        }
        Ok(())
    }

    /// Stack a list of `[C, T]` segments.  All segments must share one shape.
    pub fn from_segments(segments: &[Array2<f64>], info: Info) -> Result<Self> {
        let first = segments
            .first()
            .ok_or_else(|| RansacError::InvalidShape("no segments given".into()))?;
        let (n_c, n_t) = first.dim();
        let mut data = Array3::<f64>::zeros((segments.len(), n_c, n_t));
        for (e, seg) in segments.iter().enumerate() {
            if seg.dim() != (n_c, n_t) {
                return Err(RansacError::InvalidShape(format!(
                    "segment {e} has shape {:?}, expected [{n_c}, {n_t}]",
                    seg.dim()
                )));
            }
            data.slice_mut(s![e, .., ..]).assign(seg);
        }
        Self::new(data, info)
    }

    /// Cut a continuous `[C, T]` recording into fixed-length epochs.
    pub fn from_continuous(data: &Array2<f64>, epoch_samples: usize, info: Info) -> Result<Self> {
        if epoch_samples == 0 {
            return Err(RansacError::InvalidShape("epoch_samples must be > 0".into()));
        }
        Self::new(epoch(data, epoch_samples), info)
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    pub fn n_epochs(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_channels(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_times(&self) -> usize {
        self.data.dim().2
    }

    /// Data of epoch `e` as a `[C, T]` view.
    pub fn epoch(&self, e: usize) -> ArrayView2<'_, f64> {
        self.data.slice(s![e, .., ..])
    }
}

/// Epoch `data` ([C, T]) into a 3-D array [E, C, epoch_samples].
/// Trailing samples that don't fill a complete epoch are discarded.
pub fn epoch(data: &Array2<f64>, epoch_samples: usize) -> Array3<f64> {
    let (n_ch, n_t) = data.dim();
    let n_epochs = n_t / epoch_samples;

    let mut out = Array3::<f64>::zeros((n_epochs, n_ch, epoch_samples));
    for e in 0..n_epochs {
        let start = e * epoch_samples;
        out.slice_mut(s![e, .., ..])
           .assign(&data.slice(s![.., start..start + epoch_samples]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::ChannelInfo;

    fn info(n: usize) -> Info {
        let chs = (0..n)
            .map(|i| ChannelInfo::eeg(format!("ch{i}"), [0.0, 0.0, 1.0]))
            .collect();
        Info::new(chs, 256.0)
    }

    #[test]
    fn epoch_count_and_shape() {
        let data = Array2::from_elem((12, 3840), 1.0);
        let epochs = epoch(&data, 1280);
        assert_eq!(epochs.shape(), &[3, 12, 1280]);
    }

    #[test]
    fn trailing_samples_dropped() {
        let data = Array2::from_shape_fn((4, 1300), |(_, t)| t as f64);
        let epochs = epoch(&data, 1280);
        assert_eq!(epochs.shape()[0], 1);
        assert_eq!(epochs[[0, 2, 1279]], 1279.0);
    }

    #[test]
    fn from_continuous_keeps_sample_order() {
        let data = Array2::from_shape_fn((3, 10), |(c, t)| (c * 100 + t) as f64);
        let ep = Epochs::from_continuous(&data, 5, info(3)).unwrap();
        assert_eq!(ep.n_epochs(), 2);
        assert_eq!(ep.epoch(1)[[2, 0]], 205.0);
    }

    #[test]
    fn channel_mismatch_rejected() {
        let data = Array3::zeros((2, 4, 5));
        assert!(matches!(
            Epochs::new(data, info(3)),
            Err(RansacError::InvalidShape(_))
        ));
    }

    #[test]
    fn ragged_segments_rejected() {
        let segs = vec![Array2::zeros((3, 5)), Array2::zeros((3, 6))];
        assert!(Epochs::from_segments(&segs, info(3)).is_err());
    }

    #[test]
    fn too_short_recording_rejected() {
        let data = Array2::zeros((3, 4));
        assert!(Epochs::from_continuous(&data, 5, info(3)).is_err());
    }
}
