//! Transfer Curves
//!
//! Named generators for wave-shaper transfer curves. A shaper stage may ask
//! for a curve by name instead of carrying raw sample data; the name is
//! resolved here when the stage is built.

use libm::Libm;
use std::collections::{BTreeMap, HashMap};

/// Default number of samples in a generated curve
pub const DEFAULT_CURVE_SAMPLES: usize = 44100;

/// Default drive for the `distort` curve
pub const DEFAULT_DISTORT_AMOUNT: f64 = 50.0;

/// Named numeric parameters for a curve generator
pub type CurveParams = BTreeMap<String, f64>;

/// Curve generator function: `(params, sample_count) -> curve`
pub type CurveFn = fn(&CurveParams, usize) -> Vec<f32>;

/// Soft-clipping distortion curve
///
/// For each sample `i`, `x = i * 2 / n - 1` and
/// `curve[i] = (3 + amount) * x * 20° / (π + amount * |x|)`.
///
/// A missing `amount` means 50; an explicit `amount` of 0 is kept and gives
/// a gentle linear slope rather than the default drive.
pub fn distort(params: &CurveParams, sample_count: usize) -> Vec<f32> {
    let amount = params
        .get("amount")
        .copied()
        .unwrap_or(DEFAULT_DISTORT_AMOUNT);
    let deg = core::f64::consts::PI / 180.0;
    let n = sample_count as f64;

    (0..sample_count)
        .map(|i| {
            let x = i as f64 * 2.0 / n - 1.0;
            let shaped = (3.0 + amount) * x * 20.0 * deg;
            (shaped / (core::f64::consts::PI + amount * Libm::<f64>::fabs(x))) as f32
        })
        .collect()
}

/// Lookup table of named curve generators
#[derive(Clone)]
pub struct CurveTable {
    generators: HashMap<String, CurveFn>,
}

impl core::fmt::Debug for CurveTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CurveTable")
            .field("names", &self.names())
            .finish()
    }
}

impl CurveTable {
    /// Create a table holding the built-in curves
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.register("distort", distort);
        table
    }

    /// Create a table with no curves registered
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Register (or replace) a named generator
    pub fn register(&mut self, name: impl Into<String>, generator: CurveFn) {
        self.generators.insert(name.into(), generator);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Generate a curve by name
    ///
    /// `sample_count` falls back to [`DEFAULT_CURVE_SAMPLES`].
    pub fn generate(
        &self,
        name: &str,
        params: &CurveParams,
        sample_count: Option<usize>,
    ) -> Option<Vec<f32>> {
        let generator = self.generators.get(name)?;
        Some(generator(
            params,
            sample_count.unwrap_or(DEFAULT_CURVE_SAMPLES),
        ))
    }

    /// Names of all registered curves, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.generators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CurveTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a built-in curve by name
pub fn generate_curve(
    name: &str,
    params: &CurveParams,
    sample_count: Option<usize>,
) -> Option<Vec<f32>> {
    CurveTable::new().generate(name, params, sample_count)
}
