//! Shared domain types.
//!
//! These types are intentionally small value objects: every fit call creates
//! them, hands them back to the caller, and never mutates them afterwards.

use std::path::PathBuf;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, FitResult};
use crate::math::LmOptions;
use crate::models::{lorentzian, lorentzian_triplet};

/// An ordered `(x, y)` sample series.
///
/// `x` is expected to be monotonic (sweep order) but this is not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Trace {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> FitResult<Self> {
        if x.len() != y.len() {
            return Err(FitError::shape(format!(
                "x has {} samples but y has {}",
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// The same trace with `y` negated (dip <-> peak).
    pub fn negated(&self) -> Trace {
        Trace {
            x: self.x.clone(),
            y: self.y.iter().map(|v| -v).collect(),
        }
    }
}

/// Which lineshape a fit used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Lorentzian,
    Triplet,
}

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Lorentzian => "Lorentzian",
            ModelKind::Triplet => "Lorentzian triplet",
        }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Lorentzian => &LorentzianParams::NAMES,
            ModelKind::Triplet => &TripletParams::NAMES,
        }
    }
}

/// Parameters of a single Lorentzian: center, baseline, amplitude, full width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorentzianParams {
    pub x0: f64,
    pub y0: f64,
    pub amp: f64,
    pub fwhm: f64,
}

impl LorentzianParams {
    pub const LEN: usize = 4;
    pub const NAMES: [&'static str; 4] = ["x0", "y0", "amp", "fwhm"];

    pub fn to_array(self) -> [f64; 4] {
        [self.x0, self.y0, self.amp, self.fwhm]
    }

    /// Build from a flat parameter vector in `NAMES` order.
    ///
    /// # Panics
    /// Panics if `p` has fewer than four entries.
    pub fn from_slice(p: &[f64]) -> Self {
        Self {
            x0: p[0],
            y0: p[1],
            amp: p[2],
            fwhm: p[3],
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        lorentzian(x, self.x0, self.y0, self.amp, self.fwhm)
    }

    /// Model value at the center (`y0 + amp`).
    pub fn extremum(&self) -> f64 {
        self.y0 + self.amp
    }
}

/// A flanking Lorentzian of a triplet. Its baseline is the central `y0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sideband {
    pub x: f64,
    pub amp: f64,
    pub fwhm: f64,
}

/// Central Lorentzian plus two sidebands sharing one baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripletParams {
    pub center: LorentzianParams,
    pub left: Sideband,
    pub right: Sideband,
}

impl TripletParams {
    pub const LEN: usize = 10;
    pub const NAMES: [&'static str; 10] = [
        "x0", "y0", "amp", "fwhm", "xl", "ampl", "fwhml", "xr", "ampr", "fwhmr",
    ];

    pub fn to_array(self) -> [f64; 10] {
        let c = self.center;
        [
            c.x0,
            c.y0,
            c.amp,
            c.fwhm,
            self.left.x,
            self.left.amp,
            self.left.fwhm,
            self.right.x,
            self.right.amp,
            self.right.fwhm,
        ]
    }

    /// Build from a flat parameter vector in `NAMES` order.
    ///
    /// # Panics
    /// Panics if `p` has fewer than ten entries.
    pub fn from_slice(p: &[f64]) -> Self {
        Self {
            center: LorentzianParams::from_slice(&p[..4]),
            left: Sideband {
                x: p[4],
                amp: p[5],
                fwhm: p[6],
            },
            right: Sideband {
                x: p[7],
                amp: p[8],
                fwhm: p[9],
            },
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        lorentzian_triplet(x, &self.to_array())
    }

    /// Distance between the right and left sideband centers.
    pub fn sideband_separation(&self) -> f64 {
        self.right.x - self.left.x
    }
}

/// Optional seeds for a single-Lorentzian fit. Missing fields are derived from data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LorentzianGuess {
    pub x0: Option<f64>,
    pub y0: Option<f64>,
    pub amp: Option<f64>,
    pub fwhm: Option<f64>,
}

/// Optional seeds for a triplet fit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TripletGuess {
    pub x0: Option<f64>,
    pub y0: Option<f64>,
    pub amp: Option<f64>,
    pub fwhm: Option<f64>,
    pub xl: Option<f64>,
    pub ampl: Option<f64>,
    pub fwhml: Option<f64>,
    pub xr: Option<f64>,
    pub ampr: Option<f64>,
    pub fwhmr: Option<f64>,
}

impl TripletGuess {
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(Option::is_none)
    }

    pub fn fields(&self) -> [Option<f64>; 10] {
        [
            self.x0, self.y0, self.amp, self.fwhm, self.xl, self.ampl, self.fwhml, self.xr, self.ampr,
            self.fwhmr,
        ]
    }
}

/// How a triplet fit is seeded.
///
/// Seeding is all-or-nothing: either the estimator walks the data
/// (`AutoEstimate`), or the caller's seeds are used with fixed fallbacks for
/// whatever is missing (`Explicit`). There is no mixed mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TripletSeed {
    /// Locate the central feature and both sidebands from the data.
    /// `inverted` selects dip-seeking instead of peak-seeking.
    AutoEstimate { inverted: bool },
    /// Use caller-supplied seeds.
    Explicit(TripletGuess),
}

impl TripletSeed {
    /// `AutoEstimate` when no seed is given, `Explicit` as soon as one is.
    pub fn from_guess(guess: TripletGuess, inverted: bool) -> Self {
        if guess.is_empty() {
            TripletSeed::AutoEstimate { inverted }
        } else {
            TripletSeed::Explicit(guess)
        }
    }
}

/// Per-parameter box constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    /// Constrain parameter `idx` to `[lo, hi]`.
    pub fn with_param(mut self, idx: usize, lo: f64, hi: f64) -> Self {
        if idx < self.lower.len() {
            self.lower[idx] = lo;
            self.upper[idx] = hi;
        }
        self
    }

    pub fn validate(&self, n_params: usize) -> FitResult<()> {
        if self.lower.len() != n_params || self.upper.len() != n_params {
            return Err(FitError::shape(format!(
                "bounds must have {n_params} entries (got lower={}, upper={})",
                self.lower.len(),
                self.upper.len()
            )));
        }
        for (i, (lo, hi)) in self.lower.iter().zip(&self.upper).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(FitError::shape(format!(
                    "invalid bounds for parameter {i}: [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }

    pub fn clamp(&self, params: &mut [f64]) {
        for ((p, lo), hi) in params.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.clamp(*lo, *hi);
        }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    pub iterations: usize,
}

/// Fitted parameters plus their covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome<P> {
    pub params: P,
    /// `n_params x n_params`, scaled by the residual variance.
    pub covariance: DMatrix<f64>,
    pub quality: FitQuality,
}

impl<P> FitOutcome<P> {
    /// One-sigma parameter uncertainties (square root of the covariance diagonal).
    pub fn std_errors(&self) -> Vec<f64> {
        (0..self.covariance.nrows())
            .map(|i| self.covariance[(i, i)].abs().sqrt())
            .collect()
    }
}

/// A run's configuration as understood by the pipeline.
///
/// Derived from CLI flags (plus `.env` / environment defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// EOM modulation frequency in the calibrated unit (e.g. MHz).
    pub eom_frequency: Option<f64>,
    /// Treat the central feature as a transmission dip.
    pub invert: bool,
    pub solver: LmOptions,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_json: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            eom_frequency: None,
            invert: true,
            solver: LmOptions::default(),
            plot: false,
            plot_width: 100,
            plot_height: 25,
            export_json: None,
        }
    }
}
