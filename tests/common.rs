/// Shared synthetic fixtures: sensors on a head-sized hemisphere carrying a
/// common sinusoid plus a little noise.
use exg_ransac::{ChannelInfo, ChannelKind, Epochs, Info};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Head radius in metres.
pub const HEAD_RADIUS: f64 = 0.09;

#[allow(unused)]
/// Fibonacci lattice on the upper hemisphere.
pub fn hemisphere_positions(n: usize) -> Vec<[f64; 3]> {
    let golden = PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let th = golden * i as f64;
            [HEAD_RADIUS * r * th.cos(), HEAD_RADIUS * r * th.sin(), HEAD_RADIUS * z]
        })
        .collect()
}

#[allow(unused)]
pub fn sensor_info(n: usize, kind: ChannelKind) -> Info {
    let chs = hemisphere_positions(n)
        .into_iter()
        .enumerate()
        .map(|(i, loc)| ChannelInfo::new(format!("EEG{i:03}"), kind.clone(), loc))
        .collect();
    Info::new(chs, 100.0)
}

#[allow(unused)]
pub struct Synthetic {
    pub n_channels: usize,
    pub n_epochs: usize,
    pub n_times: usize,
    /// Channels that are identically zero.
    pub dead: Vec<usize>,
    /// Epochs in which the dead channels are dead (all when `None`).
    pub dead_epochs: Option<usize>,
    pub noise: f64,
    pub seed: u64,
}

impl Default for Synthetic {
    fn default() -> Self {
        Self {
            n_channels: 10,
            n_epochs: 20,
            n_times: 5,
            dead: vec![],
            dead_epochs: None,
            noise: 0.01,
            seed: 0,
        }
    }
}

impl Synthetic {
    pub fn data(&self) -> Array3<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let dead_until = self.dead_epochs.unwrap_or(self.n_epochs);
        Array3::from_shape_fn((self.n_epochs, self.n_channels, self.n_times), |(e, c, t)| {
            let noise = self.noise * rng.gen_range(-1.0..1.0);
            if self.dead.contains(&c) && e < dead_until {
                return 0.0;
            }
            let amp = 1.0 + 0.02 * c as f64;
            let phase = 0.3 * e as f64;
            amp * (2.0 * PI * 0.13 * t as f64 + phase + 0.4).sin() + noise
        })
    }

    pub fn epochs(&self) -> Epochs {
        Epochs::new(self.data(), sensor_info(self.n_channels, ChannelKind::Eeg)).unwrap()
    }
}

#[allow(unused)]
/// Bitwise equality that treats identical NaNs as equal.
pub fn bits_eq(a: &ndarray::Array2<f64>, b: &ndarray::Array2<f64>) -> bool {
    a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}
