use super::money::PaymentRequest;
use super::order::{Capture, CaptureId, IdempotencyKey, Order, OrderId};
use super::transaction::{ApprovalOutcome, Failure, TransactionRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Client for the payment provider's order endpoints.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Creates an order. The provider deduplicates on `idempotency_key`.
    async fn create_order(
        &self,
        request: &PaymentRequest,
        idempotency_key: &IdempotencyKey,
    ) -> Result<Order>;

    /// Captures a previously approved order.
    async fn capture_order(&self, order_id: &OrderId) -> Result<Capture>;
}

/// Boundary where the payer is shown the approval page.
#[async_trait]
pub trait ApprovalHandoff: Send + Sync {
    /// Suspends until the payer approves, cancels, or the surface gives up.
    async fn present_approval(&self, approval_url: &str) -> Result<ApprovalOutcome>;
}

/// The invoking application's notification surface.
pub trait OutcomeReporter: Send + Sync {
    fn report_success(&self, capture_id: &CaptureId);
    fn report_failure(&self, reason: &Failure);
}

/// Durable trail of transaction progress, keyed by idempotency key.
#[async_trait]
pub trait TransactionJournal: Send + Sync {
    async fn record(&self, record: TransactionRecord) -> Result<()>;
    async fn get(&self, idempotency_key: &IdempotencyKey) -> Result<Option<TransactionRecord>>;
    /// Records whose order was created but never captured.
    async fn unsettled(&self) -> Result<Vec<TransactionRecord>>;
}

pub type OrderGatewayBox = Box<dyn OrderGateway>;
pub type ApprovalHandoffBox = Box<dyn ApprovalHandoff>;
pub type TransactionJournalBox = Box<dyn TransactionJournal>;
