//! Component A: the search box and the RNG-backed sampling helpers that
//! every other component draws starting points from.

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{EngineError, Result};

/// An axis-aligned box `[lo, hi]^D` that every walker is confined to.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lo: Array1<f64>,
    hi: Array1<f64>,
}

impl Bounds {
    /// Builds a box from explicit lower/upper arrays. Rejects mismatched
    /// lengths, empty bounds, and any coordinate with `lo >= hi`.
    pub fn new(lo: Array1<f64>, hi: Array1<f64>) -> Result<Self> {
        if lo.len() != hi.len() {
            return Err(EngineError::InvalidArgument(format!(
                "bounds dimension mismatch: lo has {} entries, hi has {}",
                lo.len(),
                hi.len()
            )));
        }
        if lo.is_empty() {
            return Err(EngineError::InvalidArgument("bounds must have at least one dimension".into()));
        }
        for i in 0..lo.len() {
            if !(lo[i] < hi[i]) {
                return Err(EngineError::InvalidArgument(format!(
                    "bound[{i}] has lower >= upper ({} >= {})",
                    lo[i], hi[i]
                )));
            }
        }
        Ok(Self { lo, hi })
    }

    /// Convenience constructor from `(lo, hi)` pairs, one per dimension.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let lo = Array1::from_vec(pairs.iter().map(|p| p.0).collect());
        let hi = Array1::from_vec(pairs.iter().map(|p| p.1).collect());
        Self::new(lo, hi)
    }

    pub fn dim(&self) -> usize {
        self.lo.len()
    }

    pub fn lo(&self) -> &Array1<f64> {
        &self.lo
    }

    pub fn hi(&self) -> &Array1<f64> {
        &self.hi
    }

    /// Per-coordinate `hi - lo`.
    pub fn span(&self) -> Array1<f64> {
        &self.hi - &self.lo
    }

    /// Smallest per-coordinate span, used to auto-derive the deflation radius.
    pub fn min_span(&self) -> f64 {
        self.span().iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn in_box(&self, x: &Array1<f64>) -> bool {
        if x.len() != self.dim() {
            return false;
        }
        (0..self.dim()).all(|i| x[i] >= self.lo[i] && x[i] <= self.hi[i])
    }

    /// Clips `x` into the box in place, coordinate by coordinate.
    pub fn clip(&self, x: &mut Array1<f64>) {
        for i in 0..self.dim() {
            if x[i] < self.lo[i] {
                x[i] = self.lo[i];
            } else if x[i] > self.hi[i] {
                x[i] = self.hi[i];
            }
        }
    }

    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        Array1::from_shape_fn(self.dim(), |i| rng.random_range(self.lo[i]..=self.hi[i]))
    }

    /// `n` independent uniform draws from the box, one per row.
    pub fn random_in_box<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Array2<f64> {
        let mut pop = Array2::zeros((n, self.dim()));
        for mut row in pop.rows_mut() {
            for i in 0..self.dim() {
                row[i] = rng.random_range(self.lo[i]..=self.hi[i]);
            }
        }
        pop
    }

    /// Latin Hypercube sample of `n` points: each coordinate's range is
    /// split into `n` equal strata and every stratum is used exactly once,
    /// in a coordinate-independent random order.
    pub fn sample_lhs<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Array2<f64> {
        let d = self.dim();
        let mut pop = Array2::zeros((n, d));
        if n == 0 {
            return pop;
        }
        for j in 0..d {
            let mut strata: Vec<usize> = (0..n).collect();
            strata.shuffle(rng);
            let span = self.hi[j] - self.lo[j];
            for (row, &stratum) in strata.iter().enumerate() {
                let u: f64 = rng.random_range(0.0..1.0);
                pop[[row, j]] = self.lo[j] + span * (stratum as f64 + u) / n as f64;
            }
        }
        pop
    }
}

/// Free-function form matching the component's public interface; draws
/// from a fresh thread-local RNG.
pub fn random_in_box(bounds: &Bounds, n: usize) -> Array2<f64> {
    let mut rng = rand::rng();
    bounds.random_in_box(n, &mut rng)
}

pub fn in_box(x: &Array1<f64>, bounds: &Bounds) -> bool {
    bounds.in_box(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_bounds() {
        let lo = Array1::from_vec(vec![0.0, 5.0]);
        let hi = Array1::from_vec(vec![1.0, 4.0]);
        assert!(Bounds::new(lo, hi).is_err());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let lo = Array1::from_vec(vec![0.0]);
        let hi = Array1::from_vec(vec![1.0, 2.0]);
        assert!(Bounds::new(lo, hi).is_err());
    }

    #[test]
    fn random_in_box_stays_in_box() {
        let bounds = Bounds::from_pairs(&[(-1.0, 1.0), (0.0, 10.0)]).unwrap();
        let mut rng = rand::rng();
        let pop = bounds.random_in_box(200, &mut rng);
        for row in pop.rows() {
            assert!(bounds.in_box(&row.to_owned()));
        }
    }

    #[test]
    fn lhs_covers_every_stratum() {
        let bounds = Bounds::from_pairs(&[(0.0, 10.0)]).unwrap();
        let mut rng = rand::rng();
        let n = 50;
        let pop = bounds.sample_lhs(n, &mut rng);
        let mut seen = vec![false; n];
        for row in pop.rows() {
            let stratum = (row[0] / (10.0 / n as f64)).floor() as usize;
            seen[stratum.min(n - 1)] = true;
        }
        assert!(seen.iter().all(|&s| s), "every LHS stratum should receive exactly one sample");
    }

    #[test]
    fn clip_pulls_outliers_back_to_the_face() {
        let bounds = Bounds::from_pairs(&[(0.0, 1.0)]).unwrap();
        let mut x = Array1::from_vec(vec![5.0]);
        bounds.clip(&mut x);
        assert_eq!(x[0], 1.0);
    }
}
