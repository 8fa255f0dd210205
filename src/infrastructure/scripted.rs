//! Deterministic provider and approval stand-ins.
//!
//! Used by the CLI when no provider URL is configured, and throughout the
//! tests. Order ids are issued as `O1, O2, ...`, capture ids as `C1, C2, ...`
//! and approval URLs as `https://pay/<order id>`.

use crate::domain::money::PaymentRequest;
use crate::domain::order::{Capture, CaptureId, CaptureStatus, IdempotencyKey, Order, OrderId};
use crate::domain::ports::{ApprovalHandoff, OrderGateway};
use crate::domain::transaction::ApprovalOutcome;
use crate::error::{ErrorKind, PaymentError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct ProviderState {
    next_order: u32,
    next_capture: u32,
    orders_by_key: HashMap<IdempotencyKey, Order>,
    captured: HashSet<OrderId>,
    create_calls: usize,
    idempotency_keys: Vec<IdempotencyKey>,
    capture_calls: Vec<OrderId>,
}

/// Simulated payment provider.
///
/// Deduplicates order creation on the idempotency key and refuses a second
/// capture of the same order, like a real provider would. Clones share
/// state, so a test can keep one clone to inspect calls.
#[derive(Clone, Default)]
pub struct ScriptedOrderGateway {
    state: Arc<Mutex<ProviderState>>,
    create_failure: Option<ErrorKind>,
    capture_failure: Option<ErrorKind>,
    decline_captures: bool,
    delay: Option<Duration>,
}

impl ScriptedOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create_order` call fails with `kind`.
    pub fn fail_create_with(mut self, kind: ErrorKind) -> Self {
        self.create_failure = Some(kind);
        self
    }

    /// Every `capture_order` call fails with `kind`.
    pub fn fail_capture_with(mut self, kind: ErrorKind) -> Self {
        self.capture_failure = Some(kind);
        self
    }

    /// Captures complete but come back `Declined`.
    pub fn decline_captures(mut self) -> Self {
        self.decline_captures = true;
        self
    }

    /// Sleeps before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn create_calls(&self) -> usize {
        self.state.lock().await.create_calls
    }

    pub async fn idempotency_keys(&self) -> Vec<IdempotencyKey> {
        self.state.lock().await.idempotency_keys.clone()
    }

    pub async fn capture_calls(&self) -> Vec<OrderId> {
        self.state.lock().await.capture_calls.clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl OrderGateway for ScriptedOrderGateway {
    async fn create_order(
        &self,
        request: &PaymentRequest,
        idempotency_key: &IdempotencyKey,
    ) -> Result<Order> {
        {
            let mut state = self.state.lock().await;
            state.create_calls += 1;
            state.idempotency_keys.push(idempotency_key.clone());
        }
        self.pause().await;

        if let Some(kind) = self.create_failure {
            return Err(PaymentError::from_kind(
                kind,
                format!("scripted create failure for {}", request.amount()),
            ));
        }

        let mut state = self.state.lock().await;
        if let Some(existing) = state.orders_by_key.get(idempotency_key) {
            return Ok(existing.clone());
        }
        state.next_order += 1;
        let order_id = OrderId::new(format!("O{}", state.next_order));
        let order = Order {
            approval_url: format!("https://pay/{}", order_id),
            order_id,
        };
        state
            .orders_by_key
            .insert(idempotency_key.clone(), order.clone());
        Ok(order)
    }

    async fn capture_order(&self, order_id: &OrderId) -> Result<Capture> {
        self.state
            .lock()
            .await
            .capture_calls
            .push(order_id.clone());
        self.pause().await;

        if let Some(kind) = self.capture_failure {
            return Err(PaymentError::from_kind(
                kind,
                format!("scripted capture failure for {}", order_id),
            ));
        }

        let mut state = self.state.lock().await;
        let known = state.orders_by_key.values().any(|o| &o.order_id == order_id);
        if !known {
            return Err(PaymentError::ProviderRejected(format!(
                "unknown order {}",
                order_id
            )));
        }
        if !state.captured.insert(order_id.clone()) {
            return Err(PaymentError::ProviderRejected(format!(
                "order {} already captured",
                order_id
            )));
        }
        state.next_capture += 1;
        Ok(Capture {
            capture_id: CaptureId::new(format!("C{}", state.next_capture)),
            status: if self.decline_captures {
                CaptureStatus::Declined
            } else {
                CaptureStatus::Succeeded
            },
        })
    }
}

/// Answers every approval prompt with the same outcome.
#[derive(Debug, Clone)]
pub struct FixedApprovalHandoff {
    outcome: ApprovalOutcome,
    delay: Option<Duration>,
    presented: Arc<Mutex<Vec<String>>>,
}

impl FixedApprovalHandoff {
    pub fn new(outcome: ApprovalOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            presented: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Approval URLs shown so far.
    pub async fn presented(&self) -> Vec<String> {
        self.presented.lock().await.clone()
    }
}

#[async_trait]
impl ApprovalHandoff for FixedApprovalHandoff {
    async fn present_approval(&self, approval_url: &str) -> Result<ApprovalOutcome> {
        self.presented.lock().await.push(approval_url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.outcome)
    }
}
