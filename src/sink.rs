//! Result delivery.
//!
//! Aggregate reports are produced on the frame-processing thread, but the
//! listener that wants them usually lives somewhere else (a UI thread, a
//! managed runtime). `ResultSink` is the seam; `ChannelSink` is the stock
//! implementation that marshals reports across threads through a bounded
//! queue instead of calling into foreign code from the frame loop.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::spectrum::AggregateReport;

/// One-way notification of an aggregate report.
///
/// Implementations must not block the pipeline indefinitely. An
/// implementation that crosses a thread or runtime boundary should enqueue
/// and return, as `ChannelSink` does, rather than deliver synchronously.
pub trait ResultSink: Send {
    fn on_aggregate_report(&mut self, report: &AggregateReport);
}

/// Bounded-queue sink. When the consumer falls behind and the queue is full,
/// the report is dropped with a warning; the frame loop never waits.
pub struct ChannelSink {
    tx: Sender<AggregateReport>,
    dropped: u64,
}

impl ChannelSink {
    /// Create a sink and the receiving end for the consumer thread.
    pub fn bounded(capacity: usize) -> (Self, Receiver<AggregateReport>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx, dropped: 0 }, rx)
    }

    /// Reports dropped because the queue was full or disconnected.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl ResultSink for ChannelSink {
    fn on_aggregate_report(&mut self, report: &AggregateReport) {
        match self.tx.try_send(*report) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                warn!(dropped = self.dropped, "result queue full, report dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}
