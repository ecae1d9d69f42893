//! Face geometry acquisition and tracking.
//!
//! A two-state machine that runs forever: **SEARCHING** calls the detector
//! every frame until a face appears; **TRACKING** propagates the geometry
//! with sparse optical flow, falling back to SEARCHING when too few features
//! survive the forward-backward consistency check. "No face" is a normal
//! state, never an error, and no detector or tracker call is retried within
//! a frame.

use nalgebra::Point2;
use tracing::debug;

use crate::capabilities::{CornerParams, FaceDetector, FeatureTracker};
use crate::config::{PulsecamConfig, RoiMode};
use crate::frame::{GrayBuffer, GrayFrame, RgbFrame};
use crate::geometry::{fit_similarity, forehead_polygon, transform_rect, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Searching,
    Tracking,
}

/// Immutable geometry snapshot handed to the sampling stages, so no stage
/// aliases the tracker's mutable state mid-frame.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub face: Rect,
    pub left_eye: Rect,
    pub right_eye: Rect,
    pub roi: Rect,
}

/// Outcome of one tracker update.
#[derive(Debug, Clone, Copy)]
pub struct FrameUpdate {
    /// Geometry is valid this frame; a sample may be taken.
    pub valid: bool,
    /// Geometry came from a forced re-detection, not tracking; the sample
    /// taken this frame must carry the discontinuity flag.
    pub rescanned: bool,
}

pub struct GeometryTracker {
    state: TrackingState,
    face: Rect,
    left_eye: Rect,
    right_eye: Rect,
    roi: Rect,
    corners: Vec<Point2<f32>>,
    prev_gray: Option<GrayBuffer>,
    last_scan_time: i64,

    min_face_size: u32,
    corner_params: CornerParams,
    min_corners: usize,
    fb_error_px: f32,
    roi_mode: RoiMode,
    rescan_period_sec: f64,
    time_base: f64,
}

impl GeometryTracker {
    pub fn new(config: &PulsecamConfig) -> Self {
        Self {
            state: TrackingState::Searching,
            face: Rect::default(),
            left_eye: Rect::default(),
            right_eye: Rect::default(),
            roi: Rect::default(),
            corners: Vec::new(),
            prev_gray: None,
            last_scan_time: 0,
            min_face_size: config.min_face_size(),
            corner_params: config.corner_params.clone(),
            min_corners: config.min_corners,
            fb_error_px: config.fb_error_px,
            roi_mode: config.roi_mode,
            rescan_period_sec: config.rescan_period_sec,
            time_base: config.time_base,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            face: self.face,
            left_eye: self.left_eye,
            right_eye: self.right_eye,
            roi: self.roi,
        }
    }

    /// Current sampling region.
    pub fn roi(&self) -> Rect {
        self.roi
    }

    /// Update geometry for one frame: detect, rescan, or track.
    pub fn process(
        &mut self,
        detector: &mut dyn FaceDetector,
        features: &mut dyn FeatureTracker,
        rgb: &RgbFrame,
        gray: &GrayFrame,
        time: i64,
    ) -> FrameUpdate {
        let mut rescanned = false;

        match self.state {
            TrackingState::Searching => {
                debug!("searching for a face");
                self.last_scan_time = time;
                self.detect(detector, features, rgb, gray);
            }
            TrackingState::Tracking => {
                if (time - self.last_scan_time) as f64 * self.time_base >= self.rescan_period_sec {
                    debug!("tracking, forced rescan due");
                    self.last_scan_time = time;
                    self.detect(detector, features, rgb, gray);
                    rescanned = true;
                } else {
                    self.track(features, gray);
                }
            }
        }

        self.prev_gray = Some(gray.to_owned());

        FrameUpdate {
            valid: self.is_valid(),
            rescanned,
        }
    }

    /// Discard all geometry and start searching again.
    pub fn reset(&mut self) {
        self.invalidate();
        self.prev_gray = None;
        self.face = Rect::default();
        self.last_scan_time = 0;
    }

    fn detect(
        &mut self,
        detector: &mut dyn FaceDetector,
        features: &mut dyn FeatureTracker,
        rgb: &RgbFrame,
        gray: &GrayFrame,
    ) {
        let boxes = detector.detect_faces(gray, self.min_face_size);
        if boxes.is_empty() {
            debug!("no face found");
            self.invalidate();
            return;
        }

        self.face = nearest_box(self.face, &boxes);
        if self.roi_mode == RoiMode::EyeCenter {
            self.update_eyes(detector, rgb);
        }
        self.corners =
            features.detect_features(gray, &forehead_polygon(self.face), &self.corner_params);
        self.update_roi();
        self.state = TrackingState::Tracking;
    }

    fn track(&mut self, features: &mut dyn FeatureTracker, gray: &GrayFrame) {
        // Replaced at the end of process(); taking it avoids a frame copy.
        let prev = match self.prev_gray.take() {
            Some(p) => p,
            None => {
                self.invalidate();
                return;
            }
        };
        let prev_view = prev.view();

        if self.corners.len() < self.min_corners {
            let mask = forehead_polygon(self.face);
            self.corners = features.detect_features(&prev_view, &mask, &self.corner_params);
        }

        let (forward, forward_found) = features.optical_flow(&prev_view, gray, &self.corners);
        let (backward, backward_found) = features.optical_flow(gray, &prev_view, &forward);

        // Forward-backward consistency: a feature counts only if both flows
        // succeeded and the round trip lands near its origin.
        let mut kept_prev = Vec::with_capacity(self.corners.len());
        let mut kept_curr = Vec::with_capacity(self.corners.len());
        for j in 0..self.corners.len() {
            if forward_found[j]
                && backward_found[j]
                && (self.corners[j] - backward[j]).norm() < self.fb_error_px
            {
                kept_prev.push(self.corners[j]);
                kept_curr.push(forward[j]);
            }
        }

        if kept_curr.len() < self.min_corners {
            debug!(
                survived = kept_curr.len(),
                total = self.corners.len(),
                "tracking failed, too few features survived"
            );
            self.invalidate();
            return;
        }

        match fit_similarity(&kept_prev, &kept_curr) {
            Some(m) => {
                self.corners = kept_curr;
                self.face = transform_rect(&m, self.face);
                self.left_eye = transform_rect(&m, self.left_eye);
                self.right_eye = transform_rect(&m, self.right_eye);
                self.roi = transform_rect(&m, self.roi);
            }
            None => {
                debug!("degenerate feature configuration, cannot fit transform");
                self.invalidate();
            }
        }
    }

    fn update_eyes(&mut self, detector: &mut dyn FaceDetector, rgb: &RgbFrame) {
        let left_search = self.face.fraction(0.13, 0.25, 0.30, 0.25);
        let right_search = self.face.fraction(0.57, 0.25, 0.30, 0.25);
        self.left_eye = detector.detect_eye(rgb, left_search).unwrap_or(left_search);
        self.right_eye = detector.detect_eye(rgb, right_search).unwrap_or(right_search);
    }

    fn update_roi(&mut self) {
        self.roi = match self.roi_mode {
            // Forehead strip as fixed fractions of the face box.
            RoiMode::FaceFraction => self.face.fraction(0.3, 0.1, 0.4, 0.15),
            // Rectangle above the inter-eye midpoint, scaled by the
            // inter-eye distance.
            RoiMode::EyeCenter => {
                let l = self.left_eye.center();
                let r = self.right_eye.center();
                let mid = Point2::new((l.x + r.x) / 2.0, (l.y + r.y) / 2.0);
                let d = (r - l).norm();
                Rect::new(mid.x - 0.75 * d, mid.y - 1.1 * d, 1.5 * d, 0.6 * d)
            }
        };
    }

    /// The face rect is kept stale for the nearest-box tie-break on the
    /// next detection; everything else is cleared.
    fn invalidate(&mut self) {
        self.corners.clear();
        self.state = TrackingState::Searching;
    }
}

/// Candidate whose top-left corner is nearest (squared Euclidean distance)
/// to the previously known face box, preserving subject identity across
/// transient multi-detections.
fn nearest_box(previous: Rect, boxes: &[Rect]) -> Rect {
    let mut best = boxes[0];
    let mut best_dist = f32::MAX;
    for candidate in boxes {
        let d = (candidate.tl() - previous.tl()).norm_squared();
        if d < best_dist {
            best_dist = d;
            best = *candidate;
        }
    }
    best
}
