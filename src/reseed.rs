//! Component E: global reseeding. Chooses the next epoch's `W` starting
//! points from the current best-known optima, the way
//! `original_source/hgdl/hgdl.py` re-derives starting positions each
//! epoch from `results.roll_up`, generalized to the three strategies the
//! spec names plus a user-pluggable one.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::bounds::Bounds;
use crate::error::EngineError;

type CustomReseedFn = Arc<dyn Fn(&[Array1<f64>], &[f64], &Bounds, usize) -> Array2<f64> + Send + Sync>;

/// The pluggable global reseeding strategy.
pub enum GlobalMethod {
    Random,
    Gauss,
    Genetic,
    Custom(CustomReseedFn),
}

impl Clone for GlobalMethod {
    fn clone(&self) -> Self {
        match self {
            GlobalMethod::Random => GlobalMethod::Random,
            GlobalMethod::Gauss => GlobalMethod::Gauss,
            GlobalMethod::Genetic => GlobalMethod::Genetic,
            GlobalMethod::Custom(f) => GlobalMethod::Custom(f.clone()),
        }
    }
}

impl fmt::Debug for GlobalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GlobalMethod::Random => "Random",
            GlobalMethod::Gauss => "Gauss",
            GlobalMethod::Genetic => "Genetic",
            GlobalMethod::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

impl GlobalMethod {
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        match name {
            "random" => Ok(GlobalMethod::Random),
            "gauss" => Ok(GlobalMethod::Gauss),
            "genetic" => Ok(GlobalMethod::Genetic),
            other => Err(EngineError::InvalidArgument(format!("unknown global method '{other}'"))),
        }
    }
}

/// Inverse-rank weights, normalized to sum to one: `X_top[0]` (the best
/// point) is the most likely to be picked, `X_top[len-1]` the least.
fn rank_weights(n: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..n).map(|i| 1.0 / (i as f64 + 1.0)).collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

fn weighted_pick<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let mut u: f64 = rng.random_range(0.0..1.0);
    for (i, &w) in weights.iter().enumerate() {
        if u < w {
            return i;
        }
        u -= w;
    }
    weights.len() - 1
}

/// Box-Muller standard normal sample, hand-rolled rather than pulling in
/// `rand_distr` for a single distribution.
fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn reseed_gauss<R: Rng + ?Sized>(x_top: &[Array1<f64>], bounds: &Bounds, w: usize, rng: &mut R) -> Array2<f64> {
    let d = bounds.dim();
    let sigma = bounds.span().mapv(|s| s / 20.0);
    let weights = rank_weights(x_top.len());
    let mut out = Array2::zeros((w, d));
    for mut row in out.rows_mut() {
        let idx = weighted_pick(&weights, rng);
        for j in 0..d {
            row[j] = x_top[idx][j] + sample_standard_normal(rng) * sigma[j];
        }
        let mut clipped = row.to_owned();
        bounds.clip(&mut clipped);
        row.assign(&clipped);
    }
    out
}

fn reseed_genetic<R: Rng + ?Sized>(x_top: &[Array1<f64>], bounds: &Bounds, w: usize, rng: &mut R) -> Array2<f64> {
    let d = bounds.dim();
    let mutation_sigma = bounds.span().mapv(|s| s * 0.05);
    let weights = rank_weights(x_top.len());
    let mutation_rate = 1.0 / d as f64;
    let mut out = Array2::zeros((w, d));
    for mut row in out.rows_mut() {
        let parent_a = &x_top[weighted_pick(&weights, rng)];
        let parent_b = &x_top[weighted_pick(&weights, rng)];
        for j in 0..d {
            let mut value = if rng.random_bool(0.5) { parent_a[j] } else { parent_b[j] };
            if rng.random_range(0.0..1.0) < mutation_rate {
                value += sample_standard_normal(rng) * mutation_sigma[j];
            }
            row[j] = value;
        }
        let mut clipped = row.to_owned();
        bounds.clip(&mut clipped);
        row.assign(&clipped);
    }
    out
}

/// Draws `w` fresh starting points for the next epoch. `x_top`/`f_top`
/// are parallel slices, best (lowest `f_val`) first; an empty `x_top`
/// (no optima recorded yet) always falls back to a uniform box draw,
/// regardless of the configured method.
pub fn reseed<R: Rng + ?Sized>(
    method: &GlobalMethod,
    x_top: &[Array1<f64>],
    f_top: &[f64],
    bounds: &Bounds,
    w: usize,
    rng: &mut R,
) -> Array2<f64> {
    if x_top.is_empty() {
        return bounds.random_in_box(w, rng);
    }
    match method {
        GlobalMethod::Random => bounds.random_in_box(w, rng),
        GlobalMethod::Gauss => reseed_gauss(x_top, bounds, w, rng),
        GlobalMethod::Genetic => reseed_genetic(x_top, bounds, w, rng),
        GlobalMethod::Custom(f) => f(x_top, f_top, bounds, w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_x_top_falls_back_to_random() {
        let bounds = Bounds::from_pairs(&[(-1.0, 1.0)]).unwrap();
        let mut rng = rand::rng();
        let out = reseed(&GlobalMethod::Genetic, &[], &[], &bounds, 5, &mut rng);
        assert_eq!(out.nrows(), 5);
        for row in out.rows() {
            assert!(bounds.in_box(&row.to_owned()));
        }
    }

    #[test]
    fn gauss_reseed_stays_in_box() {
        let bounds = Bounds::from_pairs(&[(-1.0, 1.0), (-1.0, 1.0)]).unwrap();
        let x_top = vec![Array1::from_vec(vec![0.9, -0.9]), Array1::from_vec(vec![-0.9, 0.9])];
        let mut rng = rand::rng();
        let out = reseed_gauss(&x_top, &bounds, 50, &mut rng);
        for row in out.rows() {
            assert!(bounds.in_box(&row.to_owned()));
        }
    }

    #[test]
    fn genetic_reseed_stays_in_box() {
        let bounds = Bounds::from_pairs(&[(-1.0, 1.0), (-1.0, 1.0)]).unwrap();
        let x_top = vec![Array1::from_vec(vec![0.9, -0.9]), Array1::from_vec(vec![-0.9, 0.9])];
        let mut rng = rand::rng();
        let out = reseed_genetic(&x_top, &bounds, 50, &mut rng);
        for row in out.rows() {
            assert!(bounds.in_box(&row.to_owned()));
        }
    }

    #[test]
    fn rank_weights_favor_the_best_point() {
        let weights = rank_weights(3);
        assert!(weights[0] > weights[1]);
        assert!(weights[1] > weights[2]);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
