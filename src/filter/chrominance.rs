//! Chrominance strategy (CHROM, de Haan & Jeanne 2013).
//!
//! Combines all three color channels into two chrominance signals that
//! cancel specular motion artifacts, band-passes both to the heart-rate
//! band, and mixes them with a ratio chosen from their filtered standard
//! deviations.

use ndarray::Array1;
use num_complex::Complex32;
use rustfft::FftPlanner;

use super::{denoise, normalize};
use crate::spectrum::band_bins;

pub(crate) fn combine(
    r: &Array1<f32>,
    g: &Array1<f32>,
    b: &Array1<f32>,
    flags: &[bool],
    fps: f64,
    low_bpm: f64,
    high_bpm: f64,
) -> Array1<f32> {
    let n = g.len();
    if n < 2 {
        return g.clone();
    }

    let rn = normalize(&denoise(r, flags));
    let gn = normalize(&denoise(g, flags));
    let bn = normalize(&denoise(b, flags));

    // X = 3R - 2G, Y = 1.5R + G - 1.5B
    let x = &rn * 3.0 - &gn * 2.0;
    let y = &rn * 1.5 + &gn - &bn * 1.5;

    let (low, high) = band_bins(n, fps, low_bpm, high_bpm);
    let xf = bandpass(&x, low, high);
    let yf = bandpass(&y, low, high);

    let sx = std_dev(&xf);
    let sy = std_dev(&yf);
    // Degenerate Y leaves X unmixed rather than producing NaN.
    let alpha = if sy > f32::EPSILON { sx / sy } else { 0.0 };

    &xf - &(&yf * alpha)
}

/// FFT band-pass: zero every bin outside `[low, high]` (and the mirrored
/// negative-frequency bins), then invert. Length-preserving.
pub(crate) fn bandpass(signal: &Array1<f32>, low: usize, high: usize) -> Array1<f32> {
    let n = signal.len();
    if n < 2 {
        return signal.clone();
    }

    let mut planner = FftPlanner::new();
    let mut buffer: Vec<Complex32> = signal.iter().map(|&v| Complex32::new(v, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut buffer);

    let mut keep = vec![false; n];
    for k in low..=high.min(n - 1) {
        keep[k] = true;
        keep[(n - k) % n] = true;
    }
    for (k, c) in buffer.iter_mut().enumerate() {
        if !keep[k] {
            *c = Complex32::new(0.0, 0.0);
        }
    }

    planner.plan_fft_inverse(n).process(&mut buffer);
    let scale = 1.0 / n as f32;
    buffer.iter().map(|c| c.re * scale).collect()
}

fn std_dev(x: &Array1<f32>) -> f32 {
    if x.is_empty() {
        return 0.0;
    }
    let mean = x.sum() / x.len() as f32;
    (x.mapv(|v| (v - mean) * (v - mean)).sum() / x.len() as f32).sqrt()
}
