//! End-to-end pipeline test on a synthetic video: a static "face" whose
//! color pulses sinusoidally at a known heart rate.

use nalgebra::Point2;
use pulsecam::{
    CornerParams, ChannelSink, FaceDetector, FeatureTracker, GrayFrame, PulsecamConfig, Rect,
    RgbFrame, RppgPipeline, SignalMethod,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FPS: f64 = 30.0;
const FRAME_US: i64 = 33_333;
const PULSE_HZ: f64 = 1.2; // 72 BPM

struct FixedFaceDetector;

impl FaceDetector for FixedFaceDetector {
    fn detect_faces(&mut self, _frame: &GrayFrame, _min_size: u32) -> Vec<Rect> {
        vec![Rect::new(100.0, 60.0, 120.0, 120.0)]
    }
}

/// Static scene: features never move and every flow succeeds.
struct StaticFlow;

impl FeatureTracker for StaticFlow {
    fn detect_features(
        &mut self,
        _frame: &GrayFrame,
        mask: &pulsecam::geometry::Polygon,
        _params: &CornerParams,
    ) -> Vec<Point2<f32>> {
        let origin = mask.vertices[0];
        (0..8)
            .map(|i| {
                let jitter = (i % 3) as f32 * 5.0;
                Point2::new(origin.x + 4.0 + 7.0 * i as f32, origin.y + 4.0 + jitter)
            })
            .collect()
    }

    fn optical_flow(
        &mut self,
        _prev: &GrayFrame,
        _curr: &GrayFrame,
        points: &[Point2<f32>],
    ) -> (Vec<Point2<f32>>, Vec<bool>) {
        (points.to_vec(), vec![true; points.len()])
    }
}

/// Uniform frame whose green channel carries the pulse.
fn synth_frames(frame_idx: i64) -> (Vec<u8>, Vec<u8>) {
    let t = frame_idx as f64 / FPS;
    let pulse = (2.0 * std::f64::consts::PI * PULSE_HZ * t).sin();
    let g = (128.0 + 20.0 * pulse) as u8;

    let mut rgb = Vec::with_capacity((WIDTH * HEIGHT * 3) as usize);
    for _ in 0..WIDTH * HEIGHT {
        rgb.extend_from_slice(&[110, g, 95]);
    }
    let gray = vec![g; (WIDTH * HEIGHT) as usize];
    (rgb, gray)
}

fn run_pipeline(method: SignalMethod, frames: i64) -> Vec<pulsecam::AggregateReport> {
    let (sink, reports) = ChannelSink::bounded(64);
    let mut pipeline = RppgPipeline::new(
        PulsecamConfig {
            width: WIDTH,
            height: HEIGHT,
            signal_method: method,
            rescan_period_sec: 60.0, // no rescan churn inside the test
            ..Default::default()
        },
        Box::new(FixedFaceDetector),
        Box::new(StaticFlow),
        Box::new(sink),
    )
    .expect("valid config");

    for i in 0..frames {
        let (rgb, gray) = synth_frames(i);
        pipeline.process_frame(
            &RgbFrame::new(&rgb, WIDTH, HEIGHT),
            &GrayFrame::new(&gray, WIDTH, HEIGHT),
            i * FRAME_US,
        );
    }
    pipeline.shutdown();

    reports.try_iter().collect()
}

#[test]
fn recovers_injected_heart_rate_single_channel() {
    let reports = run_pipeline(SignalMethod::SingleChannel, 300);
    assert!(!reports.is_empty(), "expected at least one aggregate report");

    // 72 BPM injected; allow one bin of spectral resolution (about
    // 7.5 BPM for a 4-8 second window at 30 fps) around the last report.
    let last = reports.last().unwrap();
    assert!(
        (last.mean_bpm - 72.0).abs() <= 8.0,
        "mean {} too far from 72",
        last.mean_bpm
    );
    assert!(last.min_bpm <= last.mean_bpm && last.mean_bpm <= last.max_bpm);
}

#[test]
fn no_reports_before_minimum_window() {
    // 100 frames is 3.3 s of signal, below the 4 s minimum: estimation
    // never runs, so no BPM is ever accumulated or emitted.
    let reports = run_pipeline(SignalMethod::SingleChannel, 100);
    assert!(reports.is_empty());
}

#[test]
fn chrominance_method_also_converges() {
    let reports = run_pipeline(SignalMethod::Chrominance, 300);
    assert!(!reports.is_empty());
    let last = reports.last().unwrap();
    assert!(last.mean_bpm.is_finite());
    assert!(
        (last.mean_bpm - 72.0).abs() <= 10.0,
        "mean {} too far from 72",
        last.mean_bpm
    );
}

#[test]
fn reports_follow_sampling_schedule() {
    let reports = run_pipeline(SignalMethod::SingleChannel, 300);
    // Successive report timestamps are at least a sampling period apart.
    for pair in reports.windows(2) {
        let dt = (pair[1].timestamp - pair[0].timestamp) as f64 * 1e-6;
        assert!(dt >= 1.0 - 1e-6, "reports only {:.3}s apart", dt);
    }
}
