//! Fetch progress tracking
//!
//! Progress flows to the presentation layer over a bounded channel.
//! Intermediate updates are best-effort; the terminal update at 1.0 is
//! delivered exactly once per operation.

use log::warn;
use tokio::sync::mpsc;

/// Capacity of the progress channel handed to presentation layers
pub const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// Highest fraction an intermediate update may carry; 1.0 belongs to `finish`
const MAX_INTERMEDIATE: f32 = 0.99;

/// One progress update
#[derive(Debug, Clone, PartialEq)]
pub struct FetchProgress {
    pub fraction: f32, // 0.0 to 1.0
    pub message: String,
    pub is_error: bool,
}

/// Sub-range of the overall `[0, 1]` progress scale owned by one pipeline step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub start: f32,
    pub end: f32,
}

impl ProgressRange {
    pub fn new(start: f32, end: f32) -> Self {
        let start = start.clamp(0.0, 1.0);
        Self {
            start,
            end: end.clamp(start, 1.0),
        }
    }

    /// Map a local completion ratio onto this range
    pub fn at(&self, ratio: f32) -> f32 {
        self.start + (self.end - self.start) * ratio.clamp(0.0, 1.0)
    }

    /// Split at `share` of the width: (leading, trailing)
    pub fn split(&self, share: f32) -> (Self, Self) {
        let mid = self.at(share);
        (Self::new(self.start, mid), Self::new(mid, self.end))
    }
}

/// Sends progress for a single fetch operation
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<FetchProgress>>,
    last: f32,
    finished: bool,
    disabled: bool,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::Sender<FetchProgress>) -> Self {
        Self {
            tx: Some(tx),
            last: 0.0,
            finished: false,
            disabled: false,
        }
    }

    /// Reporter for callers that do not consume progress
    pub fn silent() -> Self {
        Self {
            tx: None,
            last: 0.0,
            finished: false,
            disabled: true,
        }
    }

    /// Create a reporter together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::Receiver<FetchProgress>) {
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        (Self::new(tx), rx)
    }

    /// Last fraction handed out
    pub fn last_fraction(&self) -> f32 {
        self.last
    }

    /// Best-effort intermediate update; never goes backwards and never reaches 1.0
    pub fn report(&mut self, fraction: f32, message: impl Into<String>) {
        if self.finished {
            return;
        }
        let fraction = if fraction.is_finite() {
            fraction.clamp(self.last, MAX_INTERMEDIATE.max(self.last))
        } else {
            self.last
        };
        self.last = fraction;

        if self.disabled {
            return;
        }
        let Some(tx) = &self.tx else { return };
        let update = FetchProgress {
            fraction,
            message: message.into(),
            is_error: false,
        };
        if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(update) {
            warn!("Progress channel closed, continuing fetch without updates");
            self.disabled = true;
        }
    }

    /// Terminal update at 1.0; only the first call has an effect
    pub async fn finish(&mut self, message: impl Into<String>, is_error: bool) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.last = 1.0;

        let Some(tx) = self.tx.take() else { return };
        let update = FetchProgress {
            fraction: 1.0,
            message: message.into(),
            is_error,
        };
        if tx.send(update).await.is_err() {
            warn!("Progress channel closed before the final update");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
