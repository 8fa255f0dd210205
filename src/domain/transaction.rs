use super::money::PaymentRequest;
use super::order::{AttemptId, Capture, CaptureId, CaptureStatus, IdempotencyKey, Order, OrderId};
use crate::error::{ErrorKind, PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resume signal from the approval surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The payer backed out of the approval page.
    UserCancelled,
    /// The approval wait ran out.
    ApprovalTimedOut,
    /// The invoking context went away while waiting.
    Aborted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CancelReason::UserCancelled => "payer cancelled approval",
            CancelReason::ApprovalTimedOut => "approval timed out",
            CancelReason::Aborted => "approval aborted by caller",
        };
        f.write_str(text)
    }
}

/// Why a transaction ended without a capture.
///
/// Carries the order id when one was created so the order can be reconciled
/// by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub order_id: Option<OrderId>,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, order_id: Option<OrderId>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            order_id,
            detail: detail.into(),
        }
    }

    pub fn from_error(err: &PaymentError, order_id: Option<OrderId>) -> Self {
        Self::new(err.kind(), order_id, err.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.order_id {
            Some(order_id) => write!(f, "{} (order {}): {}", self.kind, order_id, self.detail),
            None => write!(f, "{}: {}", self.kind, self.detail),
        }
    }
}

/// Payload-free name of a state, used for transition checks and journaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTag {
    Pending,
    Created,
    AwaitingApproval,
    Approved,
    Captured,
    Failed,
    Cancelled,
}

impl StateTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateTag::Pending => "pending",
            StateTag::Created => "created",
            StateTag::AwaitingApproval => "awaiting_approval",
            StateTag::Approved => "approved",
            StateTag::Captured => "captured",
            StateTag::Failed => "failed",
            StateTag::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StateTag::Captured | StateTag::Failed | StateTag::Cancelled
        )
    }

    /// The transition table. Every path to `Captured` runs through
    /// `AwaitingApproval` and `Approved`.
    pub fn can_transition_to(&self, next: StateTag) -> bool {
        use StateTag::*;
        matches!(
            (self, next),
            (Pending, Created)
                | (Pending, Failed)
                | (Created, AwaitingApproval)
                | (Created, Failed)
                | (AwaitingApproval, Approved)
                | (AwaitingApproval, Cancelled)
                | (AwaitingApproval, Failed)
                | (Approved, Captured)
                | (Approved, Failed)
        )
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionState {
    Pending,
    Created(Order),
    AwaitingApproval(Order),
    Approved(Order),
    Captured(Capture),
    Failed(Failure),
    Cancelled(CancelReason),
}

impl TransactionState {
    pub fn tag(&self) -> StateTag {
        match self {
            TransactionState::Pending => StateTag::Pending,
            TransactionState::Created(_) => StateTag::Created,
            TransactionState::AwaitingApproval(_) => StateTag::AwaitingApproval,
            TransactionState::Approved(_) => StateTag::Approved,
            TransactionState::Captured(_) => StateTag::Captured,
            TransactionState::Failed(_) => StateTag::Failed,
            TransactionState::Cancelled(_) => StateTag::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.tag().is_terminal()
    }
}

/// The inputs of one payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAttempt {
    pub attempt_id: AttemptId,
    pub idempotency_key: IdempotencyKey,
    pub request: PaymentRequest,
}

impl PaymentAttempt {
    /// A fresh attempt with generated attempt id and idempotency key.
    pub fn new(request: PaymentRequest) -> Self {
        Self {
            attempt_id: AttemptId::generate(),
            idempotency_key: IdempotencyKey::generate(),
            request,
        }
    }

    /// Binds the attempt to a caller-chosen id, e.g. one per user tap.
    pub fn with_attempt_id(mut self, attempt_id: AttemptId) -> Self {
        self.attempt_id = attempt_id;
        self
    }

    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = key;
        self
    }
}

/// What the invoking context is told once the transaction ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Succeeded {
        order_id: OrderId,
        capture_id: CaptureId,
    },
    Failed(Failure),
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionOutcome::Succeeded { .. })
    }
}

/// One transaction attempt moving through the state machine.
///
/// Holds exactly one live state; `advance` refuses anything the transition
/// table does not allow, so no state is ever revisited.
#[derive(Debug)]
pub struct Transaction {
    attempt: PaymentAttempt,
    state: TransactionState,
    order_id: Option<OrderId>,
    history: Vec<StateTag>,
}

impl Transaction {
    pub fn new(attempt: PaymentAttempt) -> Self {
        Self {
            attempt,
            state: TransactionState::Pending,
            order_id: None,
            history: vec![StateTag::Pending],
        }
    }

    pub fn attempt(&self) -> &PaymentAttempt {
        &self.attempt
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    /// Order id issued by the provider, once one exists.
    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn history(&self) -> &[StateTag] {
        &self.history
    }

    pub fn advance(&mut self, next: TransactionState) -> Result<()> {
        let from = self.state.tag();
        let to = next.tag();
        if !from.can_transition_to(to) {
            return Err(PaymentError::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            });
        }
        if let TransactionState::Created(order) = &next {
            self.order_id = Some(order.order_id.clone());
        }
        self.state = next;
        self.history.push(to);
        Ok(())
    }

    /// Terminal outcome for the reporter.
    ///
    /// A transaction left in a non-terminal state is reported as a network
    /// class failure: the remote side may hold an order we never finished.
    pub fn outcome(&self) -> TransactionOutcome {
        match &self.state {
            TransactionState::Captured(capture) if capture.status == CaptureStatus::Succeeded => {
                match &self.order_id {
                    Some(order_id) => TransactionOutcome::Succeeded {
                        order_id: order_id.clone(),
                        capture_id: capture.capture_id.clone(),
                    },
                    None => TransactionOutcome::Failed(Failure::new(
                        ErrorKind::ProviderRejected,
                        None,
                        "capture recorded without an order",
                    )),
                }
            }
            TransactionState::Captured(capture) => TransactionOutcome::Failed(Failure::new(
                ErrorKind::ProviderRejected,
                self.order_id.clone(),
                format!("capture {} declined", capture.capture_id),
            )),
            TransactionState::Failed(failure) => TransactionOutcome::Failed(failure.clone()),
            TransactionState::Cancelled(reason) => TransactionOutcome::Failed(Failure::new(
                ErrorKind::Cancelled,
                self.order_id.clone(),
                reason.to_string(),
            )),
            other => TransactionOutcome::Failed(Failure::new(
                ErrorKind::Network,
                self.order_id.clone(),
                format!("transaction abandoned in state {}", other.tag()),
            )),
        }
    }

    pub fn to_record(&self) -> TransactionRecord {
        let (capture_id, failure) = match &self.state {
            TransactionState::Captured(capture) => (Some(capture.capture_id.clone()), None),
            TransactionState::Failed(failure) => (None, Some(failure.clone())),
            TransactionState::Cancelled(reason) => (
                None,
                Some(Failure::new(
                    ErrorKind::Cancelled,
                    self.order_id.clone(),
                    reason.to_string(),
                )),
            ),
            _ => (None, None),
        };
        TransactionRecord {
            attempt_id: self.attempt.attempt_id.clone(),
            idempotency_key: self.attempt.idempotency_key.clone(),
            request: self.attempt.request.clone(),
            state: self.state.tag(),
            order_id: self.order_id.clone(),
            capture_id,
            failure,
            step: self.history.len() as u32,
        }
    }
}

/// Journal entry: the latest known state of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub attempt_id: AttemptId,
    pub idempotency_key: IdempotencyKey,
    pub request: PaymentRequest,
    pub state: StateTag,
    pub order_id: Option<OrderId>,
    pub capture_id: Option<CaptureId>,
    pub failure: Option<Failure>,
    /// Number of states visited so far, starting at 1 for `Pending`.
    pub step: u32,
}

impl TransactionRecord {
    /// An order exists at the provider but was never captured.
    pub fn is_unsettled(&self) -> bool {
        self.order_id.is_some() && self.state != StateTag::Captured
    }
}
