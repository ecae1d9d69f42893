//! # pulsecam
//!
//! Remote photoplethysmography (rPPG): heart-rate estimation from a live
//! video stream of a face.
//!
//! The crate covers the per-frame processing core:
//! - **Geometry tracking**: face acquisition, forward-backward optical-flow
//!   tracking, periodic rescans
//! - **Signal buffering**: a time-bounded sliding window sized from the
//!   measured (not assumed) frame rate
//! - **Filtering**: denoise, detrend, and moving-average or chrominance
//!   strategies producing a pulse waveform
//! - **Estimation**: band-limited spectral peak search and timed mean/min/max
//!   aggregation delivered through a result sink
//!
//! Face detection and optical flow are supplied by the host through the
//! [`FaceDetector`] and [`FeatureTracker`] traits.
//!
//! ## Example
//!
//! ```ignore
//! use pulsecam::{ChannelSink, PulsecamConfig, RgbFrame, GrayFrame, RppgPipeline};
//!
//! let (sink, reports) = ChannelSink::bounded(16);
//! let mut pipeline = RppgPipeline::new(
//!     PulsecamConfig::default(),
//!     Box::new(my_detector),
//!     Box::new(my_flow),
//!     Box::new(sink),
//! )?;
//!
//! for frame in camera {
//!     pipeline.process_frame(
//!         &RgbFrame::new(&frame.rgb, frame.width, frame.height),
//!         &GrayFrame::new(&frame.gray, frame.width, frame.height),
//!         frame.timestamp_us,
//!     );
//!     while let Ok(report) = reports.try_recv() {
//!         println!("{:.1} bpm", report.mean_bpm);
//!     }
//! }
//! pipeline.shutdown();
//! ```

pub mod buffer;
pub mod capabilities;
pub mod config;
pub mod diag;
pub mod error;
pub mod filter;
pub mod frame;
pub mod geometry;
pub mod pipeline;
pub mod sink;
pub mod spectrum;
pub mod tracker;

pub use buffer::{Sample, SignalBuffer};
pub use capabilities::{CornerParams, FaceDetector, FeatureTracker};
pub use config::{PulsecamConfig, RoiMode, SignalMethod};
pub use error::PulsecamError;
pub use filter::FilterChain;
pub use frame::{GrayFrame, RgbFrame};
pub use geometry::Rect;
pub use pipeline::RppgPipeline;
pub use sink::{ChannelSink, ResultSink};
pub use spectrum::{AggregateReport, FrequencyEstimator, SpectrumEstimate};
pub use tracker::{Geometry, GeometryTracker, TrackingState};
