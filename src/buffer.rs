//! Time-bounded sliding window of per-frame color samples.
//!
//! The window is bounded by a duration, not a frame count: after every admit,
//! samples are evicted from the front until the spanned time fits inside
//! `max_signal_sec`. The frame rate is always measured from the buffer's own
//! current contents, never cached, so a camera that delivers 24 fps instead
//! of a nominal 30 sizes the window correctly.

use std::collections::VecDeque;

use ndarray::Array1;

/// One admitted frame: capture time, per-channel mean color, and whether the
/// geometry was re-acquired (rather than tracked) immediately before it.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    /// Monotonic capture timestamp in raw source units.
    pub timestamp: i64,
    /// Mean [R, G, B] over the sampling ROI.
    pub rgb: [f32; 3],
    /// Spatial continuity with the previous sample cannot be assumed.
    pub discontinuity: bool,
}

#[derive(Debug)]
pub struct SignalBuffer {
    samples: VecDeque<Sample>,
    time_base: f64,
    max_signal_sec: f64,
}

impl SignalBuffer {
    pub fn new(time_base: f64, max_signal_sec: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            time_base,
            max_signal_sec,
        }
    }

    /// Append one sample, then evict from the front until the window's time
    /// span fits inside `max_signal_sec`.
    ///
    /// Timestamps must be strictly increasing; violating that is a
    /// programming error.
    pub fn admit(&mut self, sample: Sample) {
        if let Some(last) = self.samples.back() {
            debug_assert!(
                sample.timestamp > last.timestamp,
                "non-monotonic timestamp admitted: {} after {}",
                sample.timestamp,
                last.timestamp
            );
        }
        self.samples.push_back(sample);

        while self.span_seconds() > self.max_signal_sec {
            self.samples.pop_front();
        }
    }

    /// Time spanned by the current contents, in seconds.
    pub fn span_seconds(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => {
                (last.timestamp - first.timestamp) as f64 * self.time_base
            }
            _ => 0.0,
        }
    }

    /// Frame rate measured from the buffer contents:
    /// `(count - 1) / span_seconds`. `None` with fewer than two samples or a
    /// zero span.
    pub fn measured_fps(&self) -> Option<f64> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        let span = self.span_seconds();
        if span <= 0.0 {
            return None;
        }
        Some((n - 1) as f64 / span)
    }

    /// Whether the window is long enough for estimation:
    /// `count / fps >= min_signal_sec`.
    pub fn has_min_window(&self, min_signal_sec: f64) -> bool {
        match self.measured_fps() {
            Some(fps) => self.samples.len() as f64 / fps >= min_signal_sec,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Discard all contents. Called when face tracking is lost; no signal
    /// carries over across a loss.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// One color channel (0 = R, 1 = G, 2 = B) as an array.
    pub fn channel(&self, idx: usize) -> Array1<f32> {
        self.samples.iter().map(|s| s.rgb[idx]).collect()
    }

    pub fn discontinuities(&self) -> Vec<bool> {
        self.samples.iter().map(|s| s.discontinuity).collect()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn sample(t: i64, g: f32) -> Sample {
        Sample {
            timestamp: t,
            rgb: [0.0, g, 0.0],
            discontinuity: false,
        }
    }

    // 30 fps with microsecond timestamps.
    const FRAME_US: i64 = 33_333;

    #[test]
    fn test_measured_fps_formula() {
        let mut buf = SignalBuffer::new(1e-6, 8.0);
        for i in 0..150 {
            buf.admit(sample(i * FRAME_US, 0.0));
        }
        let fps = buf.measured_fps().unwrap();
        let expected = 149.0 / ((149 * FRAME_US) as f64 * 1e-6);
        assert_relative_eq!(fps, expected, epsilon = 1e-9);
        assert_relative_eq!(fps, 30.0, epsilon = 0.1);
    }

    #[test]
    fn test_fps_needs_two_samples() {
        let mut buf = SignalBuffer::new(1e-6, 8.0);
        assert!(buf.measured_fps().is_none());
        buf.admit(sample(0, 0.0));
        assert!(buf.measured_fps().is_none());
    }

    #[test]
    fn test_eviction_bounds_span() {
        let mut buf = SignalBuffer::new(1e-6, 2.0);
        for i in 0..200 {
            buf.admit(sample(i * FRAME_US, 0.0));
            assert!(buf.span_seconds() <= 2.0 + 1e-9);
        }
        // Steady state: roughly 2 seconds of 30 fps frames.
        assert!(buf.len() >= 59 && buf.len() <= 62);
    }

    #[test]
    fn test_min_window_gate() {
        let mut buf = SignalBuffer::new(1e-6, 8.0);
        for i in 0..100 {
            buf.admit(sample(i * FRAME_US, 0.0));
        }
        // 100 samples at 30 fps is 3.3 s, below a 4 s minimum.
        assert!(!buf.has_min_window(4.0));

        for i in 100..150 {
            buf.admit(sample(i * FRAME_US, 0.0));
        }
        assert!(buf.has_min_window(4.0));
    }

    #[test]
    fn test_reset_clears() {
        let mut buf = SignalBuffer::new(1e-6, 8.0);
        buf.admit(sample(0, 1.0));
        buf.admit(sample(FRAME_US, 2.0));
        buf.reset();
        assert!(buf.is_empty());
        assert!(buf.measured_fps().is_none());
    }

    #[test]
    fn test_channel_order() {
        let mut buf = SignalBuffer::new(1e-6, 8.0);
        buf.admit(sample(0, 1.0));
        buf.admit(sample(FRAME_US, 2.0));
        buf.admit(sample(2 * FRAME_US, 3.0));
        let g = buf.channel(1);
        assert_eq!(g.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "non-monotonic")]
    #[cfg(debug_assertions)]
    fn test_non_monotonic_panics_in_debug() {
        let mut buf = SignalBuffer::new(1e-6, 8.0);
        buf.admit(sample(100, 0.0));
        buf.admit(sample(50, 0.0));
    }

    proptest! {
        #[test]
        fn prop_span_never_exceeds_max(deltas in prop::collection::vec(1i64..200_000, 1..300)) {
            let mut buf = SignalBuffer::new(1e-6, 3.0);
            let mut t = 0i64;
            for d in deltas {
                t += d;
                buf.admit(sample(t, 0.0));
                prop_assert!(buf.span_seconds() <= 3.0 + 1e-9);
                if let Some(fps) = buf.measured_fps() {
                    let expected = (buf.len() - 1) as f64 / buf.span_seconds();
                    prop_assert!((fps - expected).abs() < 1e-9);
                }
            }
        }
    }
}
