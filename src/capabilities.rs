//! Pluggable vision capabilities.
//!
//! The pipeline does not ship a face detector or an optical-flow
//! implementation; those are supplied by the host application (OpenCV,
//! MediaPipe, a mobile vision SDK). These traits define the seam. All calls
//! are synchronous and stateless across frames from the pipeline's point of
//! view; a failed call is a normal "not found" outcome, never an error.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::frame::{GrayFrame, RgbFrame};
use crate::geometry::{Polygon, Rect};

/// Corner-detection parameters, in goodFeaturesToTrack terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CornerParams {
    /// Maximum number of features to return.
    pub max_corners: usize,
    /// Relative quality threshold (0-1).
    pub quality_level: f32,
    /// Minimum Euclidean distance between returned features, in pixels.
    pub min_distance: f32,
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            max_corners: 10,
            quality_level: 0.01,
            min_distance: 25.0,
        }
    }
}

/// Face and eye region detection.
pub trait FaceDetector: Send {
    /// Detect candidate face boxes no smaller than `min_size` pixels on a
    /// side. An empty result means no face this frame.
    fn detect_faces(&mut self, frame: &GrayFrame, min_size: u32) -> Vec<Rect>;

    /// Refine an eye location within `search`. Optional; the default
    /// reports nothing and the caller falls back to fractional placement.
    fn detect_eye(&mut self, _frame: &RgbFrame, _search: Rect) -> Option<Rect> {
        None
    }
}

/// Feature detection and sparse optical flow.
pub trait FeatureTracker: Send {
    /// Detect corner features inside `mask`.
    fn detect_features(
        &mut self,
        frame: &GrayFrame,
        mask: &Polygon,
        params: &CornerParams,
    ) -> Vec<Point2<f32>>;

    /// Sparse optical flow from `prev` to `curr` for `points`.
    ///
    /// Returns the flowed points and a per-point found flag; both have the
    /// same length as `points`.
    fn optical_flow(
        &mut self,
        prev: &GrayFrame,
        curr: &GrayFrame,
        points: &[Point2<f32>],
    ) -> (Vec<Point2<f32>>, Vec<bool>);
}
