//! Filtering chain: raw buffered color samples to a denoised pulse waveform.
//!
//! Both strategies are pure functions of the current window contents; the
//! waveform is recomputed from scratch on every admitted sample and always
//! has exactly the window's length.

mod chrominance;
mod detrend;

pub use detrend::detrend;

use ndarray::Array1;

use crate::buffer::SignalBuffer;
use crate::config::SignalMethod;

pub struct FilterChain {
    method: SignalMethod,
    low_bpm: f64,
    high_bpm: f64,
}

impl FilterChain {
    pub fn new(method: SignalMethod, low_bpm: f64, high_bpm: f64) -> Self {
        Self {
            method,
            low_bpm,
            high_bpm,
        }
    }

    /// Derive the pulse waveform from the current window at the measured
    /// frame rate.
    pub fn waveform(&self, buffer: &SignalBuffer, fps: f64) -> Array1<f32> {
        let flags = buffer.discontinuities();
        match self.method {
            SignalMethod::SingleChannel => single_channel(&buffer.channel(1), &flags, fps),
            SignalMethod::Chrominance => chrominance::combine(
                &buffer.channel(0),
                &buffer.channel(1),
                &buffer.channel(2),
                &flags,
                fps,
                self.low_bpm,
                self.high_bpm,
            ),
        }
    }
}

/// Green-channel strategy: denoise, detrend, moving average.
fn single_channel(green: &Array1<f32>, flags: &[bool], fps: f64) -> Array1<f32> {
    let denoised = denoise(green, flags);
    let normalized = normalize(&denoised);
    let detrended = detrend(&normalized, fps as f32);
    moving_average(&detrended, 3, ((fps / 3.0).round() as usize).max(1))
}

/// Replace each discontinuity-flagged sample by linear interpolation between
/// its nearest non-flagged neighbors, so a re-detection jump does not appear
/// as a spurious high-frequency component.
pub(crate) fn denoise(values: &Array1<f32>, flags: &[bool]) -> Array1<f32> {
    debug_assert_eq!(values.len(), flags.len());
    let mut out = values.clone();

    for i in 0..values.len() {
        if !flags[i] {
            continue;
        }
        let prev = (0..i).rev().find(|&j| !flags[j]);
        let next = (i + 1..values.len()).find(|&k| !flags[k]);
        out[i] = match (prev, next) {
            (Some(j), Some(k)) => {
                let frac = (i - j) as f32 / (k - j) as f32;
                values[j] + frac * (values[k] - values[j])
            }
            (Some(j), None) => values[j],
            (None, Some(k)) => values[k],
            (None, None) => values[i],
        };
    }
    out
}

/// Subtract the mean and divide by it. Falls back to mean subtraction alone
/// for an all-zero signal.
pub(crate) fn normalize(values: &Array1<f32>) -> Array1<f32> {
    if values.is_empty() {
        return values.clone();
    }
    let mean = values.sum() / values.len() as f32;
    if mean.abs() > f32::EPSILON {
        values.mapv(|v| (v - mean) / mean)
    } else {
        values.mapv(|v| v - mean)
    }
}

/// Centered box average of width `window`, applied `passes` times. Edges
/// average over the in-range part of the window.
pub(crate) fn moving_average(values: &Array1<f32>, passes: usize, window: usize) -> Array1<f32> {
    let n = values.len();
    let window = window.max(1);
    let half = window / 2;

    let mut current = values.clone();
    for _ in 0..passes {
        let mut next = Array1::zeros(n);
        for i in 0..n {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let mut sum = 0.0f32;
            for j in lo..hi {
                sum += current[j];
            }
            next[i] = sum / (hi - lo) as f32;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::buffer::{Sample, SignalBuffer};
    use std::f32::consts::PI;

    fn buffer_from_green(values: &[f32], flags: &[bool]) -> SignalBuffer {
        let mut buf = SignalBuffer::new(1e-6, 60.0);
        for (i, (&g, &f)) in values.iter().zip(flags).enumerate() {
            buf.admit(Sample {
                timestamp: i as i64 * 33_333,
                rgb: [g, g, g],
                discontinuity: f,
            });
        }
        buf
    }

    #[test]
    fn test_denoise_interpolates_flagged() {
        let values = Array1::from(vec![1.0, 2.0, 100.0, 4.0, 5.0]);
        let flags = vec![false, false, true, false, false];
        let out = denoise(&values, &flags);
        assert_relative_eq!(out[2], 3.0, epsilon = 1e-5);
        assert_relative_eq!(out[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(out[4], 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_denoise_flagged_edge() {
        let values = Array1::from(vec![100.0, 2.0, 3.0]);
        let flags = vec![true, false, false];
        let out = denoise(&values, &flags);
        assert_relative_eq!(out[0], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_zero_mean_unit_scale() {
        let values = Array1::from(vec![90.0, 100.0, 110.0]);
        let out = normalize(&values);
        assert_relative_eq!(out.sum(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(out[0], -0.1, epsilon = 1e-5);
        assert_relative_eq!(out[2], 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_moving_average_preserves_constant() {
        let values = Array1::from(vec![5.0; 32]);
        let out = moving_average(&values, 3, 10);
        assert_eq!(out.len(), 32);
        for v in out.iter() {
            assert_relative_eq!(*v, 5.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let values = Array1::from(vec![1.0, 4.0, 2.0, 8.0]);
        let out = moving_average(&values, 3, 1);
        for (a, b) in out.iter().zip(values.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_chain_is_pure() {
        let n = 150;
        let values: Vec<f32> = (0..n)
            .map(|i| 100.0 + 5.0 * (2.0 * PI * i as f32 / 30.0).sin())
            .collect();
        let flags = vec![false; n];
        let buf = buffer_from_green(&values, &flags);

        let chain = FilterChain::new(SignalMethod::SingleChannel, 42.0, 240.0);
        let a = chain.waveform(&buf, 30.0);
        let b = chain.waveform(&buf, 30.0);
        assert_eq!(a.len(), n);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chain_preserves_length_chrominance() {
        let n = 128;
        let values: Vec<f32> = (0..n)
            .map(|i| 100.0 + 5.0 * (2.0 * PI * i as f32 / 25.0).sin())
            .collect();
        let flags = vec![false; n];
        let buf = buffer_from_green(&values, &flags);

        let chain = FilterChain::new(SignalMethod::Chrominance, 42.0, 240.0);
        let wave = chain.waveform(&buf, 30.0);
        assert_eq!(wave.len(), n);
        assert!(wave.iter().all(|v| v.is_finite()));
    }
}
