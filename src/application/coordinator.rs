use super::cancel::CancelSignal;
use super::guard::InFlightGuard;
use super::reporter::OnceReporter;
use crate::config::CoordinatorConfig;
use crate::domain::order::{CaptureStatus, Order};
use crate::domain::ports::{
    ApprovalHandoffBox, OrderGatewayBox, OutcomeReporter, TransactionJournalBox,
};
use crate::domain::transaction::{
    ApprovalOutcome, CancelReason, Failure, PaymentAttempt, Transaction, TransactionOutcome,
    TransactionState,
};
use crate::error::{ErrorKind, PaymentError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives payment attempts through create-order, approval and capture.
///
/// `TransactionCoordinator` owns its collaborators and the in-flight guard.
/// Every invocation runs exactly one transaction to a terminal state and
/// notifies the caller's reporter exactly once; provider and handoff errors
/// never escape as `Err`.
pub struct TransactionCoordinator {
    gateway: OrderGatewayBox,
    handoff: ApprovalHandoffBox,
    journal: TransactionJournalBox,
    config: CoordinatorConfig,
    guard: InFlightGuard,
}

impl TransactionCoordinator {
    /// Creates a new `TransactionCoordinator`.
    ///
    /// # Arguments
    ///
    /// * `gateway` - Client for the provider's order endpoints.
    /// * `handoff` - Presentation boundary that collects payer approval.
    /// * `journal` - Store for per-attempt progress records.
    /// * `config` - Timeout budgets.
    pub fn new(
        gateway: OrderGatewayBox,
        handoff: ApprovalHandoffBox,
        journal: TransactionJournalBox,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            gateway,
            handoff,
            journal,
            config,
            guard: InFlightGuard::new(),
        }
    }

    pub fn journal(&self) -> &TransactionJournalBox {
        &self.journal
    }

    /// Runs `attempt` to completion and reports the outcome.
    pub async fn execute(
        &self,
        attempt: PaymentAttempt,
        reporter: &dyn OutcomeReporter,
    ) -> TransactionOutcome {
        self.execute_with_cancel(attempt, reporter, CancelSignal::never())
            .await
    }

    /// Like `execute`, but the approval wait ends early if `cancel` fires.
    pub async fn execute_with_cancel(
        &self,
        attempt: PaymentAttempt,
        reporter: &dyn OutcomeReporter,
        mut cancel: CancelSignal,
    ) -> TransactionOutcome {
        let reporter = OnceReporter::new(reporter);

        let _permit = match self.guard.try_acquire(&attempt.attempt_id) {
            Ok(permit) => permit,
            Err(e) => {
                warn!(attempt = %attempt.attempt_id, "rejecting duplicate invocation");
                let outcome = TransactionOutcome::Failed(Failure::new(
                    ErrorKind::AlreadyInProgress,
                    None,
                    e.to_string(),
                ));
                reporter.deliver(&outcome);
                return outcome;
            }
        };

        let mut tx = Transaction::new(attempt);
        info!(
            attempt = %tx.attempt().attempt_id,
            amount = %tx.attempt().request.amount(),
            currency = %tx.attempt().request.currency(),
            "starting payment transaction"
        );
        self.persist(&tx).await;

        if let Err(e) = self.drive(&mut tx, &mut cancel).await {
            // Only reachable on a transition-table violation.
            warn!(attempt = %tx.attempt().attempt_id, "transaction aborted: {}", e);
            if !tx.state().is_terminal() {
                let failure = Failure::from_error(&e, tx.order_id().cloned());
                if tx.advance(TransactionState::Failed(failure)).is_ok() {
                    self.persist(&tx).await;
                }
            }
        }

        let outcome = tx.outcome();
        reporter.deliver(&outcome);
        outcome
    }

    async fn drive(&self, tx: &mut Transaction, cancel: &mut CancelSignal) -> Result<()> {
        if cancel.is_cancelled() {
            info!(attempt = %tx.attempt().attempt_id, "cancelled before order creation");
            let failure = Failure::new(ErrorKind::Cancelled, None, CancelReason::Aborted.to_string());
            return self.transition(tx, TransactionState::Failed(failure)).await;
        }

        let created = self
            .bounded(
                "create_order",
                self.gateway
                    .create_order(&tx.attempt().request, &tx.attempt().idempotency_key),
            )
            .await;
        let order = match created {
            Ok(order) => order,
            Err(e) => {
                // Not retried: a retry with the same key is the caller's call.
                return self
                    .transition(tx, TransactionState::Failed(Failure::from_error(&e, None)))
                    .await;
            }
        };

        self.transition(tx, TransactionState::Created(order.clone()))
            .await?;
        self.transition(tx, TransactionState::AwaitingApproval(order.clone()))
            .await?;

        if let Err(reason) = self.await_approval(&order, cancel).await {
            return self
                .transition(tx, TransactionState::Cancelled(reason))
                .await;
        }
        self.transition(tx, TransactionState::Approved(order.clone()))
            .await?;

        // Approval windows are short, so a failed capture is surfaced, not retried.
        let next = match self
            .bounded("capture_order", self.gateway.capture_order(&order.order_id))
            .await
        {
            Ok(capture) if capture.status == CaptureStatus::Succeeded => {
                TransactionState::Captured(capture)
            }
            Ok(capture) => TransactionState::Failed(Failure::new(
                ErrorKind::ProviderRejected,
                Some(order.order_id.clone()),
                format!("capture {} declined", capture.capture_id),
            )),
            Err(e) => TransactionState::Failed(Failure::from_error(
                &e,
                Some(order.order_id.clone()),
            )),
        };
        self.transition(tx, next).await
    }

    /// Waits for the payer. `Err` carries why no capture may follow.
    ///
    /// A fired cancel signal always wins over an approval that arrives at the
    /// same time.
    async fn await_approval(
        &self,
        order: &Order,
        cancel: &mut CancelSignal,
    ) -> std::result::Result<(), CancelReason> {
        if cancel.is_cancelled() {
            return Err(CancelReason::Aborted);
        }

        let wait = tokio::time::timeout(
            self.config.approval_timeout,
            self.handoff.present_approval(&order.approval_url),
        );

        let decision = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CancelReason::Aborted),
            result = wait => match result {
                Ok(Ok(ApprovalOutcome::Approved)) => Ok(()),
                Ok(Ok(ApprovalOutcome::Cancelled)) => Err(CancelReason::UserCancelled),
                Ok(Ok(ApprovalOutcome::TimedOut)) | Err(_) => Err(CancelReason::ApprovalTimedOut),
                Ok(Err(e)) => {
                    warn!(order = %order.order_id, "approval handoff failed: {}", e);
                    Err(CancelReason::Aborted)
                }
            },
        };

        match decision {
            Ok(()) if cancel.is_cancelled() => Err(CancelReason::Aborted),
            other => other,
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        with_deadline(self.config.gateway_timeout, operation, call).await
    }

    async fn transition(&self, tx: &mut Transaction, next: TransactionState) -> Result<()> {
        let from = tx.state().tag();
        let to = next.tag();
        tx.advance(next)?;
        debug!(attempt = %tx.attempt().attempt_id, %from, %to, "state transition");
        if to.is_terminal() {
            info!(
                attempt = %tx.attempt().attempt_id,
                order = ?tx.order_id().map(|o| o.as_str()),
                state = %to,
                "transaction finished"
            );
        }
        self.persist(tx).await;
        Ok(())
    }

    /// Journal failures are logged; they never change the payment outcome.
    async fn persist(&self, tx: &Transaction) {
        if let Err(e) = self.journal.record(tx.to_record()).await {
            warn!(attempt = %tx.attempt().attempt_id, "failed to journal transaction: {}", e);
        }
    }
}

async fn with_deadline<T>(
    budget: Duration,
    operation: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(PaymentError::Timeout(format!(
            "{} exceeded {}ms",
            operation,
            budget.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::PaymentRequest;
    use crate::domain::order::{CaptureId, IdempotencyKey, OrderId};
    use crate::domain::ports::TransactionJournal;
    use crate::domain::transaction::StateTag;
    use crate::infrastructure::in_memory::InMemoryJournal;
    use crate::infrastructure::reporters::{RecordingReporter, ReportedOutcome};
    use crate::infrastructure::scripted::{FixedApprovalHandoff, ScriptedOrderGateway};
    use rust_decimal_macros::dec;

    fn coordinator(
        gateway: ScriptedOrderGateway,
        approval: ApprovalOutcome,
        journal: InMemoryJournal,
    ) -> TransactionCoordinator {
        TransactionCoordinator::new(
            Box::new(gateway),
            Box::new(FixedApprovalHandoff::new(approval)),
            Box::new(journal),
            CoordinatorConfig::default(),
        )
    }

    fn attempt(amount: rust_decimal::Decimal) -> PaymentAttempt {
        PaymentAttempt::new(PaymentRequest::new(amount, "USD").unwrap())
    }

    #[tokio::test]
    async fn test_successful_payment_reports_capture_once() {
        let gateway = ScriptedOrderGateway::new();
        let journal = InMemoryJournal::new();
        let coordinator = coordinator(gateway.clone(), ApprovalOutcome::Approved, journal.clone());
        let reporter = RecordingReporter::new();

        let attempt = attempt(dec!(25.00));
        let key = attempt.idempotency_key.clone();
        let outcome = coordinator.execute(attempt, &reporter).await;

        assert_eq!(
            outcome,
            TransactionOutcome::Succeeded {
                order_id: OrderId::new("O1"),
                capture_id: CaptureId::new("C1"),
            }
        );
        assert_eq!(
            reporter.calls(),
            vec![ReportedOutcome::Success(CaptureId::new("C1"))]
        );
        assert_eq!(gateway.create_calls().await, 1);
        assert_eq!(gateway.capture_calls().await, vec![OrderId::new("O1")]);

        let record = journal.get(&key).await.unwrap().unwrap();
        assert_eq!(record.state, StateTag::Captured);
        assert_eq!(record.step, 5);
    }

    #[tokio::test]
    async fn test_declined_capture_fails_with_order_id() {
        let gateway = ScriptedOrderGateway::new().decline_captures();
        let coordinator = coordinator(gateway, ApprovalOutcome::Approved, InMemoryJournal::new());
        let reporter = RecordingReporter::new();

        let outcome = coordinator.execute(attempt(dec!(5.00)), &reporter).await;

        match outcome {
            TransactionOutcome::Failed(failure) => {
                assert_eq!(failure.kind, ErrorKind::ProviderRejected);
                assert_eq!(failure.order_id, Some(OrderId::new("O1")));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(reporter.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_user_cancel_skips_capture() {
        let gateway = ScriptedOrderGateway::new();
        let coordinator = coordinator(gateway.clone(), ApprovalOutcome::Cancelled, InMemoryJournal::new());
        let reporter = RecordingReporter::new();

        let outcome = coordinator.execute(attempt(dec!(5.00)), &reporter).await;

        assert!(!outcome.is_success());
        assert!(gateway.capture_calls().await.is_empty());
        match &reporter.calls()[..] {
            [ReportedOutcome::Failure(failure)] => {
                assert_eq!(failure.kind, ErrorKind::Cancelled);
                assert_eq!(failure.order_id, Some(OrderId::new("O1")));
            }
            other => panic!("unexpected calls {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gateway_timeout_is_a_failure_outcome() {
        let gateway = ScriptedOrderGateway::new().with_delay(Duration::from_millis(500));
        let coordinator = TransactionCoordinator::new(
            Box::new(gateway.clone()),
            Box::new(FixedApprovalHandoff::new(ApprovalOutcome::Approved)),
            Box::new(InMemoryJournal::new()),
            CoordinatorConfig {
                gateway_timeout: Duration::from_millis(20),
                approval_timeout: Duration::from_secs(5),
            },
        );
        let reporter = RecordingReporter::new();

        let outcome = coordinator.execute(attempt(dec!(1.00)), &reporter).await;

        match outcome {
            TransactionOutcome::Failed(failure) => {
                assert_eq!(failure.kind, ErrorKind::Timeout);
                assert_eq!(failure.order_id, None);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_idempotency_key_is_forwarded() {
        let gateway = ScriptedOrderGateway::new();
        let coordinator = coordinator(gateway.clone(), ApprovalOutcome::Approved, InMemoryJournal::new());
        let reporter = RecordingReporter::new();

        let key = IdempotencyKey::new("key-123");
        let attempt = attempt(dec!(3.00)).with_idempotency_key(key.clone());
        coordinator.execute(attempt, &reporter).await;

        assert_eq!(gateway.idempotency_keys().await, vec![key]);
    }

    #[tokio::test]
    async fn test_guard_released_after_completion() {
        let gateway = ScriptedOrderGateway::new();
        let coordinator = coordinator(gateway.clone(), ApprovalOutcome::Approved, InMemoryJournal::new());
        let id = crate::domain::order::AttemptId::new("tap");

        for _ in 0..2 {
            let reporter = RecordingReporter::new();
            let outcome = coordinator
                .execute(attempt(dec!(2.00)).with_attempt_id(id.clone()), &reporter)
                .await;
            assert!(outcome.is_success());
        }
        assert_eq!(gateway.create_calls().await, 2);
    }

    #[tokio::test]
    async fn test_cancel_before_start_skips_provider() {
        for _ in 0..50 {
            let gateway = ScriptedOrderGateway::new();
            let journal = InMemoryJournal::new();
            let coordinator = coordinator(gateway.clone(), ApprovalOutcome::Approved, journal.clone());
            let reporter = RecordingReporter::new();
            let (handle, signal) = CancelSignal::pair();
            handle.cancel();

            let attempt = attempt(dec!(7.00));
            let key = attempt.idempotency_key.clone();
            let outcome = coordinator
                .execute_with_cancel(attempt, &reporter, signal)
                .await;

            match outcome {
                TransactionOutcome::Failed(failure) => {
                    assert_eq!(failure.kind, ErrorKind::Cancelled);
                    assert_eq!(failure.order_id, None);
                }
                other => panic!("unexpected outcome {:?}", other),
            }
            assert_eq!(reporter.calls().len(), 1);
            assert_eq!(gateway.create_calls().await, 0);
            assert!(gateway.capture_calls().await.is_empty());

            let record = journal.get(&key).await.unwrap().unwrap();
            assert_eq!(record.state, StateTag::Failed);
            assert!(!record.is_unsettled());
        }
    }

    #[tokio::test]
    async fn test_cancel_during_create_never_captures() {
        for _ in 0..20 {
            let gateway = ScriptedOrderGateway::new().with_delay(Duration::from_millis(30));
            let handoff = FixedApprovalHandoff::new(ApprovalOutcome::Approved);
            let coordinator = TransactionCoordinator::new(
                Box::new(gateway.clone()),
                Box::new(handoff.clone()),
                Box::new(InMemoryJournal::new()),
                CoordinatorConfig::default(),
            );
            let reporter = RecordingReporter::new();
            let (handle, signal) = CancelSignal::pair();

            let run = coordinator.execute_with_cancel(attempt(dec!(8.00)), &reporter, signal);
            let cancel = async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                handle.cancel();
            };
            let (outcome, ()) = tokio::join!(run, cancel);

            match outcome {
                TransactionOutcome::Failed(failure) => {
                    assert_eq!(failure.kind, ErrorKind::Cancelled);
                    assert_eq!(failure.order_id, Some(OrderId::new("O1")));
                }
                other => panic!("unexpected outcome {:?}", other),
            }
            assert_eq!(gateway.create_calls().await, 1);
            assert!(gateway.capture_calls().await.is_empty());
            assert!(handoff.presented().await.is_empty());
        }
    }
}
