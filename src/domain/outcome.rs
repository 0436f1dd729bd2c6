use super::video::SourceVideoRef;
use std::fmt;

/// Why an item did not make it through its pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    FetchFailed,
    TranscodeFailed { rendition: String },
    ThumbnailFailed,
    PublishFailed { artifact: String },
    /// Local scratch space could not be prepared or written.
    WorkspaceFailed,
    TimedOut,
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::FetchFailed => write!(f, "FetchFailed"),
            FailureKind::TranscodeFailed { rendition } => {
                write!(f, "TranscodeFailed{{{}}}", rendition)
            }
            FailureKind::ThumbnailFailed => write!(f, "ThumbnailFailed"),
            FailureKind::PublishFailed { artifact } => write!(f, "PublishFailed{{{}}}", artifact),
            FailureKind::WorkspaceFailed => write!(f, "WorkspaceFailed"),
            FailureKind::TimedOut => write!(f, "TimedOut"),
            FailureKind::Panicked => write!(f, "Panicked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one item pipeline run. Consumed once by the sweep aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub video_id: String,
    pub key: String,
    pub failure: Option<ItemFailure>,
}

impl PipelineOutcome {
    pub fn succeeded(item: &SourceVideoRef) -> Self {
        Self {
            video_id: item.video_id.clone(),
            key: item.key.clone(),
            failure: None,
        }
    }

    pub fn failed(item: &SourceVideoRef, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            video_id: item.video_id.clone(),
            key: item.key.clone(),
            failure: Some(ItemFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Counts for one sweep.
///
/// `attempted` counts items a worker actually started; `abandoned` counts
/// queued items left behind after cancellation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub abandoned: usize,
}

impl BatchResult {
    pub fn record(&mut self, outcome: &PipelineOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failed > 0 || self.abandoned > 0
    }

    pub fn discovered(&self) -> usize {
        self.attempted + self.abandoned
    }
}
