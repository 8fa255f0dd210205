use crate::domain::order::AttemptId;
use crate::error::{PaymentError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks which payment attempts currently have a transaction running.
#[derive(Default, Clone)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<AttemptId>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `attempt_id`, or fails with `AlreadyInProgress` if it is taken.
    ///
    /// The claim is released when the returned permit is dropped.
    pub fn try_acquire(&self, attempt_id: &AttemptId) -> Result<InFlightPermit> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(attempt_id.clone()) {
            return Err(PaymentError::AlreadyInProgress(attempt_id.to_string()));
        }
        Ok(InFlightPermit {
            active: Arc::clone(&self.active),
            attempt_id: attempt_id.clone(),
        })
    }

    pub fn is_active(&self, attempt_id: &AttemptId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(attempt_id)
    }
}

pub struct InFlightPermit {
    active: Arc<Mutex<HashSet<AttemptId>>>,
    attempt_id: AttemptId,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.attempt_id);
    }
}
