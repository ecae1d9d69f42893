//! Frequency-domain heart-rate estimation and timed aggregation.
//!
//! The estimator turns each pulse waveform into an instantaneous BPM via a
//! band-limited power-spectrum peak search, collects those BPM values, and
//! on a sampling schedule folds them into a mean/min/max report.

use ndarray::Array1;
use num_complex::Complex32;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SEC_PER_MIN: f64 = 60.0;

/// Map the BPM band to power-spectrum bin indices for a window of `total`
/// samples at `fps`: `bin = total * bpm / 60 / fps`, upper bound widened by
/// one bin, both clamped to valid indices.
pub(crate) fn band_bins(total: usize, fps: f64, low_bpm: f64, high_bpm: f64) -> (usize, usize) {
    let max_bin = total.saturating_sub(1);
    let low = ((total as f64 * low_bpm / SEC_PER_MIN / fps) as usize).min(max_bin);
    let high = ((total as f64 * high_bpm / SEC_PER_MIN / fps) as usize + 1).min(max_bin);
    (low, high.max(low))
}

/// Power spectrum of one waveform plus the band and winning bin.
#[derive(Debug, Clone)]
pub struct SpectrumEstimate {
    /// Squared FFT magnitude per bin, full waveform length.
    pub power: Array1<f32>,
    pub low_bin: usize,
    pub high_bin: usize,
    pub peak_bin: usize,
    /// Instantaneous heart-rate estimate for the winning bin.
    pub bpm: f64,
}

/// Aggregated report delivered through the result sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Raw capture timestamp of the frame that triggered emission.
    pub timestamp: i64,
    pub mean_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

pub struct FrequencyEstimator {
    low_bpm: f64,
    high_bpm: f64,
    planner: FftPlanner<f32>,
    /// Instantaneous BPM values collected since the last emission.
    accumulator: Vec<f64>,
    last_sampling_time: i64,
    last_bpm: f64,
}

impl FrequencyEstimator {
    pub fn new(low_bpm: f64, high_bpm: f64) -> Self {
        Self {
            low_bpm,
            high_bpm,
            planner: FftPlanner::new(),
            accumulator: Vec::new(),
            last_sampling_time: 0,
            last_bpm: 0.0,
        }
    }

    /// Compute the band-limited spectral peak of `waveform` and record its
    /// BPM in the accumulator. Nothing is emitted externally here.
    ///
    /// Returns `None` for waveforms too short to transform.
    pub fn estimate_instantaneous(
        &mut self,
        waveform: &Array1<f32>,
        fps: f64,
    ) -> Option<SpectrumEstimate> {
        let n = waveform.len();
        if n < 2 || fps <= 0.0 {
            return None;
        }

        let mut buffer: Vec<Complex32> =
            waveform.iter().map(|&v| Complex32::new(v, 0.0)).collect();
        self.planner.plan_fft_forward(n).process(&mut buffer);
        let power: Array1<f32> = buffer.iter().map(|c| c.norm_sqr()).collect();

        let (low, high) = band_bins(n, fps, self.low_bpm, self.high_bpm);
        let mut peak_bin = low;
        let mut peak_power = f32::MIN;
        for k in low..=high {
            if power[k] > peak_power {
                peak_power = power[k];
                peak_bin = k;
            }
        }

        let bpm = peak_bin as f64 * fps / n as f64 * SEC_PER_MIN;
        debug!(fps, total = n, peak_bin, bpm, "instantaneous estimate");

        self.accumulator.push(bpm);
        self.last_bpm = bpm;

        Some(SpectrumEstimate {
            power,
            low_bin: low,
            high_bin: high,
            peak_bin,
            bpm,
        })
    }

    /// Emit a mean/min/max report when a sampling period has elapsed since
    /// the last emission.
    ///
    /// The timer always advances when it fires; with an empty accumulator no
    /// report is produced for this period.
    pub fn maybe_emit(
        &mut self,
        now: i64,
        time_base: f64,
        sampling_period_sec: f64,
    ) -> Option<AggregateReport> {
        if ((now - self.last_sampling_time) as f64) * time_base < sampling_period_sec {
            return None;
        }
        self.last_sampling_time = now;

        if self.accumulator.is_empty() {
            return None;
        }

        self.accumulator.sort_by(f64::total_cmp);
        let mean = self.accumulator.iter().sum::<f64>() / self.accumulator.len() as f64;
        let min = self.accumulator[0];
        let max = self.accumulator[self.accumulator.len() - 1];
        self.accumulator.clear();

        Some(AggregateReport {
            timestamp: now,
            mean_bpm: mean,
            min_bpm: min,
            max_bpm: max,
        })
    }

    /// Most recent instantaneous BPM, 0.0 before the first estimate.
    pub fn last_bpm(&self) -> f64 {
        self.last_bpm
    }
}
