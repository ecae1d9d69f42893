//! Smoothness-priors detrending (Tarvainen et al., 2002).
//!
//! Removes slow drift by subtracting the smooth component
//! `w = (I + lambda^2 D2' D2)^-1 z`, where `D2` is the second-difference
//! operator. `lambda` is set from the measured frame rate, so a faster
//! camera gets a proportionally wider smoothing window.

use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::Array1;

/// Detrend `signal` with regularization strength `lambda`.
///
/// Output has the same length as the input. Inputs shorter than three
/// samples are returned unchanged (no curvature to penalize).
pub fn detrend(signal: &Array1<f32>, lambda: f32) -> Array1<f32> {
    let n = signal.len();
    if n < 3 {
        return signal.clone();
    }

    let lambda2 = (lambda as f64) * (lambda as f64);

    // A = I + lambda^2 * D2' D2, symmetric positive definite pentadiagonal.
    let mut a = DMatrix::<f64>::identity(n, n);
    for i in 0..n - 2 {
        let row = [(i, 1.0), (i + 1, -2.0), (i + 2, 1.0)];
        for &(c1, v1) in &row {
            for &(c2, v2) in &row {
                a[(c1, c2)] += lambda2 * v1 * v2;
            }
        }
    }

    let z = DVector::from_iterator(n, signal.iter().map(|&v| v as f64));
    let w = match Cholesky::new(a) {
        Some(chol) => chol.solve(&z),
        // Not reachable for lambda^2 >= 0, but never propagate a panic
        // into the frame loop.
        None => return signal.clone(),
    };

    Array1::from_iter(z.iter().zip(w.iter()).map(|(&zi, &wi)| (zi - wi) as f32))
}
