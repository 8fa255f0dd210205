use crate::domain::ports::OutcomeReporter;
use crate::domain::transaction::TransactionOutcome;
use std::sync::atomic::{AtomicBool, Ordering};

/// Wraps the caller's reporter so one transaction can notify it only once.
pub struct OnceReporter<'a> {
    inner: &'a dyn OutcomeReporter,
    delivered: AtomicBool,
}

impl<'a> OnceReporter<'a> {
    pub fn new(inner: &'a dyn OutcomeReporter) -> Self {
        Self {
            inner,
            delivered: AtomicBool::new(false),
        }
    }

    /// Forwards `outcome`. Returns false and does nothing if already delivered.
    pub fn deliver(&self, outcome: &TransactionOutcome) -> bool {
        if self.delivered.swap(true, Ordering::AcqRel) {
            tracing::warn!("outcome already delivered, dropping {:?}", outcome);
            return false;
        }
        match outcome {
            TransactionOutcome::Succeeded { capture_id, .. } => {
                self.inner.report_success(capture_id)
            }
            TransactionOutcome::Failed(failure) => self.inner.report_failure(failure),
        }
        true
    }
}
