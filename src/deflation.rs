//! Component B: the deflation kernel. Repels local searches away from
//! stationary points already recorded in the optima store, without
//! changing where the objective's own stationary points are.
//!
//! The spec's own transition function is used, in the standard form of a
//! compactly-repelled bump: letting `w = ||x - y||^2 / r^2`,
//!
//! ```text
//! b(w) = 1 - exp(1 - 1/(1 - w))   for w < 1
//! b(w) = 1                        for w >= 1
//! ```
//!
//! `b(0) = 0` (fully repelled at the deflation point itself), `b -> 1`
//! continuously as `w -> 1` (no effect outside the ball of radius `r`), and
//! `b` is C^infinity on the closed ball's boundary. `d(x) = prod_y b(x; y)`.

use ndarray::Array1;

/// `(b, grad_b)` for a single deflation point `y` at radius `r`.
fn bump_and_grad(x: &Array1<f64>, y: &Array1<f64>, r: f64) -> (f64, Array1<f64>) {
    let diff = x - y;
    let dist2 = diff.dot(&diff);
    let w = dist2 / (r * r);
    if w >= 1.0 {
        return (1.0, Array1::zeros(x.len()));
    }
    let one_minus_w = 1.0 - w;
    let b = 1.0 - (1.0 - 1.0 / one_minus_w).exp();
    // grad_x b = (1 - b) * 2(x - y) / (r^2 * (1-w)^2), derived from the
    // chain rule through w(x); see module docs for b(w).
    let coeff = (1.0 - b) * 2.0 / (r * r * one_minus_w * one_minus_w);
    (b, diff * coeff)
}

/// `d(x) = prod_y b(x; y)`, the scalar deflation factor. `1.0` when there
/// are no deflation points yet.
pub fn deflation_value(x: &Array1<f64>, points: &[Array1<f64>], r: f64) -> f64 {
    points.iter().map(|y| bump_and_grad(x, y, r).0).product()
}

/// `(d(x), grad d(x))`, computed with a guard against the `0/0` that the
/// naive `d * sum(grad_b / b)` product-rule shortcut would hit whenever `x`
/// coincides with one of the deflation points.
pub fn deflation_value_grad(x: &Array1<f64>, points: &[Array1<f64>], r: f64) -> (f64, Array1<f64>) {
    if points.is_empty() {
        return (1.0, Array1::zeros(x.len()));
    }
    let mut bs = Vec::with_capacity(points.len());
    let mut grads = Vec::with_capacity(points.len());
    for y in points {
        let (b, gb) = bump_and_grad(x, y, r);
        bs.push(b);
        grads.push(gb);
    }
    let d: f64 = bs.iter().product();
    let zero_positions: Vec<usize> = bs.iter().enumerate().filter(|(_, &b)| b == 0.0).map(|(i, _)| i).collect();

    let grad = match zero_positions.len() {
        0 => {
            let mut g = Array1::zeros(x.len());
            for (b, gb) in bs.iter().zip(grads.iter()) {
                g = g + gb / *b;
            }
            g * d
        }
        1 => {
            let idx = zero_positions[0];
            let prod_others: f64 = bs.iter().enumerate().filter(|(i, _)| *i != idx).map(|(_, &b)| b).product();
            grads[idx].clone() * prod_others
        }
        _ => Array1::zeros(x.len()),
    };
    (d, grad)
}
