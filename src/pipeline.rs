//! Per-frame processing pipeline.
//!
//! One `process_frame` call runs the whole sequence to completion on the
//! caller's thread: geometry update, sample admission, filtering,
//! estimation, and (on the sampling schedule) aggregate emission through
//! the result sink. The pipeline owns all of its mutable state exclusively
//! between calls and holds no locks.

use tracing::{debug, info, warn};

use crate::buffer::{Sample, SignalBuffer};
use crate::capabilities::{FaceDetector, FeatureTracker};
use crate::config::PulsecamConfig;
use crate::diag::DiagnosticLogger;
use crate::error::PulsecamError;
use crate::filter::FilterChain;
use crate::frame::{GrayFrame, RgbFrame};
use crate::sink::ResultSink;
use crate::spectrum::FrequencyEstimator;
use crate::tracker::GeometryTracker;

pub struct RppgPipeline {
    config: PulsecamConfig,
    tracker: GeometryTracker,
    buffer: SignalBuffer,
    filter: FilterChain,
    estimator: FrequencyEstimator,
    detector: Box<dyn FaceDetector>,
    features: Box<dyn FeatureTracker>,
    sink: Box<dyn ResultSink>,
    diag: Option<DiagnosticLogger>,
    shut_down: bool,
}

impl RppgPipeline {
    /// Validate the configuration, open diagnostic logs if enabled, and
    /// assemble the pipeline. Errors here mean the pipeline must not be
    /// started.
    pub fn new(
        config: PulsecamConfig,
        detector: Box<dyn FaceDetector>,
        features: Box<dyn FeatureTracker>,
        sink: Box<dyn ResultSink>,
    ) -> Result<Self, PulsecamError> {
        config.validate()?;

        let diag = match &config.log_dir {
            Some(dir) => Some(DiagnosticLogger::new(dir)?),
            None => None,
        };

        info!(
            width = config.width,
            height = config.height,
            method = ?config.signal_method,
            "pipeline ready"
        );

        Ok(Self {
            tracker: GeometryTracker::new(&config),
            buffer: SignalBuffer::new(config.time_base, config.max_signal_sec),
            filter: FilterChain::new(config.signal_method, config.low_bpm, config.high_bpm),
            estimator: FrequencyEstimator::new(config.low_bpm, config.high_bpm),
            config,
            detector,
            features,
            sink,
            diag,
            shut_down: false,
        })
    }

    /// Process one captured frame. `time` is the monotonic capture
    /// timestamp in raw source units (`time_base` seconds each).
    pub fn process_frame(&mut self, rgb: &RgbFrame, gray: &GrayFrame, time: i64) {
        if self.shut_down {
            warn!("process_frame called after shutdown, ignoring");
            return;
        }

        let update = self
            .tracker
            .process(&mut *self.detector, &mut *self.features, rgb, gray, time);

        if update.valid {
            let roi = self.tracker.roi();
            self.buffer.admit(Sample {
                timestamp: time,
                rgb: rgb.mean_rgb(roi),
                discontinuity: update.rescanned,
            });

            if let Some(fps) = self.buffer.measured_fps() {
                if self.buffer.has_min_window(self.config.min_signal_sec) {
                    let waveform = self.filter.waveform(&self.buffer, fps);
                    if let Some(spectrum) = self.estimator.estimate_instantaneous(&waveform, fps) {
                        if let Some(diag) = &mut self.diag {
                            let dumped = diag
                                .dump_signal(time, &self.buffer.channel(1), &waveform)
                                .and(diag.dump_spectrum(time, &spectrum));
                            if let Err(e) = dumped {
                                warn!(error = %e, "diagnostic dump failed");
                            }
                        }
                    }

                    if let Some(report) = self.estimator.maybe_emit(
                        time,
                        self.config.time_base,
                        self.config.sampling_period_sec,
                    ) {
                        debug!(
                            mean = report.mean_bpm,
                            min = report.min_bpm,
                            max = report.max_bpm,
                            "emitting aggregate report"
                        );
                        if let Some(diag) = &mut self.diag {
                            if let Err(e) = diag.log_aggregate(
                                time,
                                true,
                                report.mean_bpm,
                                report.min_bpm,
                                report.max_bpm,
                            ) {
                                warn!(error = %e, "aggregate log failed");
                            }
                        }
                        self.sink.on_aggregate_report(&report);
                    }
                }
            }
        } else {
            // No carry-over across a tracking loss; the accumulator of
            // already-estimated BPM values survives until the timer fires.
            self.buffer.reset();
        }

        if let Some(diag) = &mut self.diag {
            if let Err(e) = diag.log_instant(time, update.valid, self.estimator.last_bpm()) {
                warn!(error = %e, "per-frame log failed");
            }
        }
    }

    /// Drop all accumulated signal and geometry; configuration and the
    /// sink stay.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.buffer.reset();
    }

    /// Release held resources (diagnostic file handles). Safe to call more
    /// than once; processing calls after shutdown are ignored.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.diag = None;
        info!("pipeline shut down");
    }
}
