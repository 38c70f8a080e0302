//! Closed-form curve fitting on `(x, y)` points.
//!
//! All functions are pure. Degenerate inputs (no points, zero variance, a
//! vanishing denominator, non-positive `y` for the exponential models) return
//! [`GeoStatError::FitUndefined`] rather than NaN or infinite coefficients.
//!
//! ```
//! use geostat::models::DataPoint;
//! use geostat::regression::{linear_fit, r_squared};
//!
//! let pts: Vec<DataPoint> = vec![(1.0, 2.0).into(), (2.0, 4.0).into(), (3.0, 6.0).into()];
//! let (a, b) = linear_fit(&pts)?;
//! assert!(a.abs() < 1e-9 && (b - 2.0).abs() < 1e-9);
//! assert!((r_squared(&pts, a, b)? - 1.0).abs() < 1e-9);
//! # Ok::<(), geostat::GeoStatError>(())
//! ```

use crate::error::{GeoStatError, Result};
use crate::models::DataPoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Relative size below which the exponential fit's denominator counts as zero.
const REL_TOL: f64 = 1e-12;

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn require_positive_y(points: &[DataPoint]) -> Result<()> {
    if points.iter().any(|p| !(p.y > 0.0)) {
        return Err(GeoStatError::FitUndefined("exponential fit needs every y > 0"));
    }
    Ok(())
}

/// Ordinary least squares line `y = a + b·x`; returns `(a, b)`.
pub fn linear_fit(points: &[DataPoint]) -> Result<(f64, f64)> {
    let x_bar = mean(points.iter().map(|p| p.x)).ok_or(GeoStatError::FitUndefined("no points"))?;
    let y_bar = mean(points.iter().map(|p| p.y)).ok_or(GeoStatError::FitUndefined("no points"))?;

    let sxy: f64 = points.iter().map(|p| (p.x - x_bar) * (p.y - y_bar)).sum();
    let sxx: f64 = points.iter().map(|p| (p.x - x_bar).powi(2)).sum();
    if sxx == 0.0 || points.windows(2).all(|w| w[0].x == w[1].x) {
        return Err(GeoStatError::FitUndefined("all x values are equal"));
    }

    let b = sxy / sxx;
    let a = y_bar - b * x_bar;
    Ok((a, b))
}

/// Coefficient of determination of the line `y = a + b·x` over `points`.
pub fn r_squared(points: &[DataPoint], a: f64, b: f64) -> Result<f64> {
    let y_bar = mean(points.iter().map(|p| p.y)).ok_or(GeoStatError::FitUndefined("no points"))?;

    let ss_tot: f64 = points.iter().map(|p| (p.y - y_bar).powi(2)).sum();
    let ss_res: f64 = points.iter().map(|p| (p.y - (a + b * p.x)).powi(2)).sum();
    if ss_tot == 0.0 || points.windows(2).all(|w| w[0].y == w[1].y) {
        return Err(GeoStatError::FitUndefined("all y values are equal"));
    }

    Ok(1.0 - ss_res / ss_tot)
}

/// Fit `y = a·bˣ` by a linear fit on `(x, log₁₀ y)`; returns `(a, b)`.
pub fn exponential_fit_linearized(points: &[DataPoint]) -> Result<(f64, f64)> {
    require_positive_y(points)?;
    let logged: Vec<DataPoint> = points
        .iter()
        .map(|p| DataPoint::new(p.x, p.y.log10()))
        .collect();

    let (intercept, slope) = linear_fit(&logged)?;
    Ok((10f64.powf(intercept), 10f64.powf(slope)))
}

/// Fit `y = exp(a)·e^(b·x)` directly by y-weighted least squares on `ln y`;
/// returns `(a, b)`.
pub fn exponential_fit_least_squares(points: &[DataPoint]) -> Result<(f64, f64)> {
    if points.is_empty() {
        return Err(GeoStatError::FitUndefined("no points"));
    }
    require_positive_y(points)?;

    // Keep each sum separate: reordering these changes the rounding.
    let s_x2y: f64 = points.iter().map(|p| p.x.powi(2) * p.y).sum();
    let s_ylny: f64 = points.iter().map(|p| p.y * p.y.ln()).sum();
    let s_xy: f64 = points.iter().map(|p| p.x * p.y).sum();
    let s_xylny: f64 = points.iter().map(|p| p.x * p.y * p.y.ln()).sum();
    let s_y: f64 = points.iter().map(|p| p.y).sum();

    let lhs = s_y * s_x2y;
    let rhs = s_xy.powi(2);
    let denom = lhs - rhs;
    if denom.abs() <= REL_TOL * lhs.abs().max(rhs) {
        return Err(GeoStatError::FitUndefined("exponential fit denominator is zero"));
    }

    let a = (s_x2y * s_ylny - s_xy * s_xylny) / denom;
    let b = (s_y * s_xylny - s_xy * s_ylny) / denom;
    Ok((a, b))
}

/// Source of additive noise for the evaluate functions.
///
/// Passed in explicitly so a run can be reproduced from its seed.
pub trait NoiseSource {
    fn sample(&mut self) -> f64;
}

impl<F: FnMut() -> f64> NoiseSource for F {
    fn sample(&mut self) -> f64 {
        self()
    }
}

/// Uniform noise in `[-amplitude, amplitude]`.
#[derive(Debug, Clone)]
pub struct UniformNoise {
    amplitude: f64,
    rng: StdRng,
}

impl UniformNoise {
    /// A non-finite `amplitude` is treated as zero.
    pub fn seeded(amplitude: f64, seed: u64) -> Self {
        Self {
            amplitude: if amplitude.is_finite() { amplitude.abs() } else { 0.0 },
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for UniformNoise {
    fn sample(&mut self) -> f64 {
        if self.amplitude == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-self.amplitude..=self.amplitude)
    }
}

/// `a + b·x`, plus one draw from `noise` if given.
pub fn evaluate_linear(a: f64, b: f64, x: f64, noise: Option<&mut dyn NoiseSource>) -> f64 {
    a + b * x + noise.map_or(0.0, |n| n.sample())
}

/// `exp(a)·e^(b·x)`, plus one draw from `noise` if given.
pub fn evaluate_exponential(a: f64, b: f64, x: f64, noise: Option<&mut dyn NoiseSource>) -> f64 {
    a.exp() * (b * x).exp() + noise.map_or(0.0, |n| n.sample())
}

/// Curve families offered to callers that pick a model at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitKind {
    /// `y = a + b·x`
    Linear,
    /// `y = a·bˣ` via log₁₀
    ExpLog,
    /// `y = exp(a)·e^(b·x)`, direct least squares
    ExpLsq,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub kind: FitKind,
    pub a: f64,
    pub b: f64,
    /// Only reported for the linear model, and only when y varies.
    pub r_squared: Option<f64>,
    pub n: usize,
}

impl FitResult {
    pub fn evaluate(&self, x: f64, noise: Option<&mut dyn NoiseSource>) -> f64 {
        match self.kind {
            FitKind::Linear => evaluate_linear(self.a, self.b, x, noise),
            FitKind::ExpLog => self.a * self.b.powf(x) + noise.map_or(0.0, |n| n.sample()),
            FitKind::ExpLsq => evaluate_exponential(self.a, self.b, x, noise),
        }
    }
}

/// Fit `points` with the model `kind`.
pub fn fit(kind: FitKind, points: &[DataPoint]) -> Result<FitResult> {
    let (a, b) = match kind {
        FitKind::Linear => linear_fit(points)?,
        FitKind::ExpLog => exponential_fit_linearized(points)?,
        FitKind::ExpLsq => exponential_fit_least_squares(points)?,
    };
    // a flat line is a valid fit even though its r² is undefined
    let r_squared = match kind {
        FitKind::Linear => match r_squared(points, a, b) {
            Ok(r2) => Some(r2),
            Err(GeoStatError::FitUndefined(_)) => None,
            Err(e) => return Err(e),
        },
        _ => None,
    };
    Ok(FitResult { kind, a, b, r_squared, n: points.len() })
}
