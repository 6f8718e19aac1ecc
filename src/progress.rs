//! Progress events and cancellation
//!
//! The pipeline runs off the presentation thread and reports through an
//! unbounded channel; the presentation layer drains the receiver on its own
//! side. Cancellation flows the other way through a watch channel.

use std::fmt;
use tokio::sync::{mpsc, watch};

/// Pipeline phase a progress event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Downloading,
    Extracting,
    UpdatingPath,
    CreatingShortcut,
    Done,
    Failed,
}

impl Phase {
    /// Human-readable phase name
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Downloading => "Downloading",
            Phase::Extracting => "Extracting",
            Phase::UpdatingPath => "Updating PATH",
            Phase::CreatingShortcut => "Creating shortcut",
            Phase::Done => "Done",
            Phase::Failed => "Failed",
        }
    }

    /// Done and Failed end the event stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Completion of the current phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Fraction complete, clamped to [0, 1]
    Fraction(f64),
    /// Total amount of work is unknown
    Indeterminate,
}

impl Progress {
    /// Build a fraction from done/total counts; a zero total is indeterminate.
    pub fn from_counts(done: u64, total: u64) -> Self {
        if total == 0 {
            Progress::Indeterminate
        } else {
            Progress::Fraction((done as f64 / total as f64).clamp(0.0, 1.0))
        }
    }

    pub fn fraction(&self) -> Option<f64> {
        match self {
            Progress::Fraction(f) => Some(*f),
            Progress::Indeterminate => None,
        }
    }
}

/// One progress report from the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub progress: Progress,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(phase: Phase, progress: Progress, message: impl Into<String>) -> Self {
        Self {
            phase,
            progress,
            message: message.into(),
        }
    }
}

/// Sending half of the progress channel, handed to each pipeline step
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSender {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that drops every event
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, phase: Phase, progress: Progress, message: impl Into<String>) {
        self.send(ProgressEvent::new(phase, progress, message));
    }

    /// Send an event. A presentation layer that went away is not an error
    /// for the pipeline, so send failures are ignored.
    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Requests cancellation of a running install
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observes cancellation; checked between download chunks, while waiting
/// for the next chunk, and between archive entries
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, token) = CancelHandle::new();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pending forever if the
    /// handle is gone
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
