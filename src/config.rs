//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capabilities::CornerParams;
use crate::error::PulsecamError;

/// Strategy for turning buffered color samples into a pulse waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalMethod {
    /// Green channel only: denoise, detrend, moving average.
    SingleChannel,
    /// Chrominance combination of all three channels (X minus alpha Y).
    Chrominance,
}

/// How the sampling ROI is placed once a face box is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoiMode {
    /// Fixed fractional offsets of the face box (forehead strip).
    FaceFraction,
    /// Rectangle derived from the inter-eye midpoint and distance.
    EyeCenter,
}

/// Pipeline configuration, consumed once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulsecamConfig {
    /// Frame dimensions in pixels.
    pub width: u32,
    pub height: u32,

    /// Seconds per raw timestamp unit (1e-6 for microsecond clocks).
    pub time_base: f64,
    /// Seconds between aggregate report emissions.
    pub sampling_period_sec: f64,
    /// Seconds between forced re-detections while tracking.
    pub rescan_period_sec: f64,

    /// Minimum signal window before estimation runs, seconds.
    pub min_signal_sec: f64,
    /// Maximum signal window retained, seconds.
    pub max_signal_sec: f64,

    /// Heart-rate search band, beats per minute.
    pub low_bpm: f64,
    pub high_bpm: f64,

    /// Minimum face size as a fraction of min(width, height).
    pub rel_min_face_size: f32,
    /// Corner detection parameters for the feature tracker.
    pub corner_params: CornerParams,
    /// Minimum surviving features before tracking is declared failed.
    pub min_corners: usize,
    /// Forward-backward round-trip error threshold, pixels.
    pub fb_error_px: f32,

    pub signal_method: SignalMethod,
    pub roi_mode: RoiMode,

    /// Directory for diagnostic CSV dumps; `None` disables them.
    pub log_dir: Option<PathBuf>,
}

impl Default for PulsecamConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            time_base: 1e-6,
            sampling_period_sec: 1.0,
            rescan_period_sec: 1.0,
            min_signal_sec: 4.0,
            max_signal_sec: 8.0,
            low_bpm: 42.0,
            high_bpm: 240.0,
            rel_min_face_size: 0.2,
            corner_params: CornerParams::default(),
            min_corners: 5,
            fb_error_px: 2.0,
            signal_method: SignalMethod::SingleChannel,
            roi_mode: RoiMode::FaceFraction,
            log_dir: None,
        }
    }
}

impl PulsecamConfig {
    pub fn validate(&self) -> Result<(), PulsecamError> {
        if self.width == 0 || self.height == 0 {
            return Err(PulsecamError::InvalidConfig(
                "frame dimensions must be non-zero".into(),
            ));
        }
        if self.time_base <= 0.0 {
            return Err(PulsecamError::InvalidConfig("time_base must be positive".into()));
        }
        if self.sampling_period_sec <= 0.0 || self.rescan_period_sec <= 0.0 {
            return Err(PulsecamError::InvalidConfig(
                "sampling and rescan periods must be positive".into(),
            ));
        }
        if self.min_signal_sec <= 0.0 || self.min_signal_sec >= self.max_signal_sec {
            return Err(PulsecamError::InvalidConfig(
                "require 0 < min_signal_sec < max_signal_sec".into(),
            ));
        }
        if self.low_bpm <= 0.0 || self.low_bpm >= self.high_bpm {
            return Err(PulsecamError::InvalidConfig(
                "require 0 < low_bpm < high_bpm".into(),
            ));
        }
        if self.rel_min_face_size <= 0.0 || self.rel_min_face_size > 1.0 {
            return Err(PulsecamError::InvalidConfig(
                "require 0 < rel_min_face_size <= 1".into(),
            ));
        }
        if self.min_corners == 0 || self.corner_params.max_corners < self.min_corners {
            return Err(PulsecamError::InvalidConfig(
                "require 0 < min_corners <= max_corners".into(),
            ));
        }
        if self.fb_error_px <= 0.0 {
            return Err(PulsecamError::InvalidConfig(
                "fb_error_px must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Minimum face side length in pixels for the detector.
    pub fn min_face_size(&self) -> u32 {
        (self.width.min(self.height) as f32 * self.rel_min_face_size) as u32
    }
}
