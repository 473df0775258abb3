//! Random channel subsets.
//!
//! The generator is created once per fit from the configured seed and then
//! drives all `n_resample` permutations in sequence, so the full list of
//! subsets is reproducible for a given `(seed, n_resample, n_channels)`.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Build the RNG for one fit.  `None` seeds from the OS.
pub fn make_rng(random_state: Option<u64>) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Draw `n_resample` subsets of `n_samples` channel indices from `0..n_channels`.
///
/// Each subset is the first `n_samples` entries of a fresh permutation, so
/// indices within a subset are distinct and keep their drawn order.
pub fn random_subsets(
    rng: &mut StdRng,
    n_channels: usize,
    n_samples: usize,
    n_resample: usize,
) -> Vec<Vec<usize>> {
    let n_samples = n_samples.min(n_channels);
    let mut perm: Vec<usize> = (0..n_channels).collect();
    (0..n_resample)
        .map(|_| {
            perm.iter_mut().enumerate().for_each(|(i, p)| *p = i);
            perm.shuffle(rng);
            perm[..n_samples].to_vec()
        })
        .collect()
}
