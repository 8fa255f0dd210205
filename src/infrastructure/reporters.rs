use crate::domain::order::CaptureId;
use crate::domain::ports::OutcomeReporter;
use crate::domain::transaction::Failure;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// One call received by a reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedOutcome {
    Success(CaptureId),
    Failure(Failure),
}

/// Collects every reporter call in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    calls: Arc<Mutex<Vec<ReportedOutcome>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ReportedOutcome> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, outcome: ReportedOutcome) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
    }
}

impl OutcomeReporter for RecordingReporter {
    fn report_success(&self, capture_id: &CaptureId) {
        self.push(ReportedOutcome::Success(capture_id.clone()));
    }

    fn report_failure(&self, reason: &Failure) {
        self.push(ReportedOutcome::Failure(reason.clone()));
    }
}

/// Forwards outcomes to whichever task the presentation layer consumes on.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ReportedOutcome>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReportedOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, outcome: ReportedOutcome) {
        if self.tx.send(outcome).is_err() {
            tracing::warn!("outcome receiver dropped before delivery");
        }
    }
}

impl OutcomeReporter for ChannelReporter {
    fn report_success(&self, capture_id: &CaptureId) {
        self.send(ReportedOutcome::Success(capture_id.clone()));
    }

    fn report_failure(&self, reason: &Failure) {
        self.send(ReportedOutcome::Failure(reason.clone()));
    }
}
