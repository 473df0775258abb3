//! Spatial prediction kernels.
//!
//! - [`InterpolationKernel`]: geometric interpolation from sensor positions.
//!   The default [`SphericalSpline`] matches MNE's
//!   `_make_interpolation_matrix` (Perrin et al., 1989).
//! - [`FieldMapper`]: model-based mapping for MEG sensors.  The crate ships
//!   no implementation; supply one built from your forward model.
//! - [`Predictor`]: the kernel chosen for one fit, used both to build the
//!   RANSAC operators and to repair bad channels afterwards.
//!
//! Every kernel returns weights of shape `[n_to, n_from]`, so a prediction
//! is `weights · data[from]`.
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, Axis};

use crate::epoch::Epochs;
use crate::error::{RansacError, Result};
use crate::info::SensorFamily;

/// Regularisation added to the diagonal of the spline system.
pub const INTERPOLATION_ALPHA: f64 = 1e-5;

/// Geometric interpolation from one set of positions to another.
pub trait InterpolationKernel: Send + Sync {
    /// `from_pos`: `[n_from, 3]`, `to_pos`: `[n_to, 3]`  →  `[n_to, n_from]`.
    fn interpolation_matrix(
        &self,
        from_pos: ArrayView2<'_, f64>,
        to_pos: ArrayView2<'_, f64>,
        alpha: f64,
    ) -> Result<Array2<f64>>;
}

/// Model-based channel mapping (MEG).
pub trait FieldMapper: Send + Sync {
    /// Weights `[to.len(), from.len()]` predicting channels `to` from channels `from`.
    fn map_channels(&self, epochs: &Epochs, from: &[usize], to: &[usize]) -> Result<Array2<f64>>;
}

// ── Spherical splines ─────────────────────────────────────────────────────

/// Spherical-spline interpolation on the unit sphere.
///
/// Positions are projected onto the unit sphere (so they should be expressed
/// relative to the head centre).  The spline function is the Legendre series
///
/// ```text
/// g(x) = Σ_{n=1}^{n_terms} (2n + 1) / (nᵐ (n + 1)ᵐ 4π) · Pₙ(x)
/// ```
///
/// with stiffness `m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalSpline {
    /// Spline stiffness `m`.  Default `4`.
    pub stiffness: i32,
    /// Number of Legendre terms.  Default `50`.
    pub n_terms: usize,
}

impl Default for SphericalSpline {
    fn default() -> Self {
        Self { stiffness: 4, n_terms: 50 }
    }
}

impl SphericalSpline {
    /// Legendre coefficients `[0, f₁, …, f_n_terms]`.
    fn factors(&self) -> Vec<f64> {
        let m = self.stiffness;
        std::iter::once(0.0)
            .chain((1..=self.n_terms).map(|n| {
                let n = n as f64;
                (2.0 * n + 1.0) / (n.powi(m) * (n + 1.0).powi(m) * 4.0 * PI)
            }))
            .collect()
    }

    /// Evaluate `g` at every cosine in `cosang`.
    pub fn calc_g(&self, cosang: &Array2<f64>) -> Array2<f64> {
        let factors = self.factors();
        cosang.mapv(|x| legendre_series(x, &factors))
    }
}

/// `Σ cₙ Pₙ(x)` using the three-term recurrence.
fn legendre_series(x: f64, coefs: &[f64]) -> f64 {
    let mut p_prev = 1.0; // P0
    let mut p = x;        // P1
    let mut acc = coefs.first().copied().unwrap_or(0.0);
    if coefs.len() > 1 {
        acc += coefs[1] * p;
    }
    for (n, &c) in coefs.iter().enumerate().skip(2) {
        let k = (n - 1) as f64;
        let p_next = ((2.0 * k + 1.0) * x * p - k * p_prev) / (k + 1.0);
        p_prev = p;
        p = p_next;
        acc += c * p;
    }
    acc
}

/// Normalise each row to unit length.
fn to_unit_sphere(pos: ArrayView2<'_, f64>, what: &str) -> Result<Array2<f64>> {
    let mut out = pos.to_owned();
    for (i, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if !norm.is_finite() || norm == 0.0 {
            return Err(RansacError::InvalidPositions {
                channel: format!("{what}[{i}]"),
                reason: format!("position norm is {norm}"),
            });
        }
        row /= norm;
    }
    Ok(out)
}

/// Moore–Penrose pseudo-inverse via SVD, cut-off relative to the largest
/// singular value.
fn pinv(m: &Array2<f64>) -> Result<Array2<f64>> {
    let (r, c) = m.dim();
    let dm = DMatrix::from_fn(r, c, |i, j| m[[i, j]]);
    let svd = dm.svd(true, true);
    let s_max = svd.singular_values.max();
    let tol = s_max * r.max(c) as f64 * f64::EPSILON;
    let inv = svd
        .pseudo_inverse(tol)
        .map_err(|e| RansacError::Kernel(e.to_string()))?;
    Ok(Array2::from_shape_fn((c, r), |(i, j)| inv[(i, j)]))
}

impl InterpolationKernel for SphericalSpline {
    fn interpolation_matrix(
        &self,
        from_pos: ArrayView2<'_, f64>,
        to_pos: ArrayView2<'_, f64>,
        alpha: f64,
    ) -> Result<Array2<f64>> {
        if from_pos.ncols() != 3 || to_pos.ncols() != 3 {
            return Err(RansacError::InvalidShape("positions must have 3 columns".into()));
        }
        let n_from = from_pos.nrows();
        let n_to = to_pos.nrows();
        if n_from == 0 {
            return Err(RansacError::Kernel("cannot interpolate from 0 channels".into()));
        }

        let from = to_unit_sphere(from_pos, "from")?;
        let to = to_unit_sphere(to_pos, "to")?;

        let cos_from = from.dot(&from.t()).mapv(|v| v.clamp(-1.0, 1.0));
        let cos_to_from = to.dot(&from.t()).mapv(|v| v.clamp(-1.0, 1.0));
        let mut g_from = self.calc_g(&cos_from);
        let g_to_from = self.calc_g(&cos_to_from);
        if alpha != 0.0 {
            g_from.diag_mut().mapv_inplace(|v| v + alpha);
        }

        // [[G_from, 1], [1ᵀ, 0]]
        let mut system = Array2::<f64>::zeros((n_from + 1, n_from + 1));
        system.slice_mut(ndarray::s![..n_from, ..n_from]).assign(&g_from);
        system.slice_mut(ndarray::s![..n_from, n_from]).fill(1.0);
        system.slice_mut(ndarray::s![n_from, ..n_from]).fill(1.0);
        let system_inv = pinv(&system)?;

        // [G_to_from, 1] · C⁺[:, :-1]
        let mut lhs = Array2::<f64>::ones((n_to, n_from + 1));
        lhs.slice_mut(ndarray::s![.., ..n_from]).assign(&g_to_from);
        Ok(lhs.dot(&system_inv.slice(ndarray::s![.., ..n_from])))
    }
}

// ── Predictor ─────────────────────────────────────────────────────────────

/// Kernel used by one fit.
#[derive(Clone)]
pub enum Predictor {
    Geometric(Arc<dyn InterpolationKernel>),
    Field(Arc<dyn FieldMapper>),
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predictor::Geometric(_) => f.write_str("Predictor::Geometric"),
            Predictor::Field(_) => f.write_str("Predictor::Field"),
        }
    }
}

impl Predictor {
    /// Pick the predictor for `family`.
    pub fn for_family(
        family: SensorFamily,
        spline: &Arc<dyn InterpolationKernel>,
        mapper: Option<&Arc<dyn FieldMapper>>,
    ) -> Result<Self> {
        match family {
            SensorFamily::Eeg => Ok(Predictor::Geometric(Arc::clone(spline))),
            SensorFamily::Meg => mapper
                .map(|m| Predictor::Field(Arc::clone(m)))
                .ok_or(RansacError::MissingFieldMapper),
        }
    }

    /// Weights `[to.len(), from.len()]` predicting channels `to` from `from`.
    pub fn weights(&self, epochs: &Epochs, from: &[usize], to: &[usize]) -> Result<Array2<f64>> {
        let w = match self {
            Predictor::Geometric(kernel) => {
                let from_pos = epochs.info.positions(from);
                let to_pos = epochs.info.positions(to);
                kernel.interpolation_matrix(from_pos.view(), to_pos.view(), INTERPOLATION_ALPHA)?
            }
            Predictor::Field(mapper) => mapper.map_channels(epochs, from, to)?,
        };
        if w.dim() != (to.len(), from.len()) {
            return Err(RansacError::Kernel(format!(
                "kernel returned {:?}, expected [{}, {}]",
                w.dim(),
                to.len(),
                from.len()
            )));
        }
        Ok(w)
    }
}
