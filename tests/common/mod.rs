#![allow(dead_code)]

use paycoord::application::coordinator::TransactionCoordinator;
use paycoord::config::CoordinatorConfig;
use paycoord::domain::money::PaymentRequest;
use paycoord::domain::ports::ApprovalHandoffBox;
use paycoord::domain::transaction::PaymentAttempt;
use paycoord::infrastructure::in_memory::InMemoryJournal;
use paycoord::infrastructure::scripted::ScriptedOrderGateway;
use rust_decimal::Decimal;
use std::io::Write;
use std::time::Duration;

pub fn attempt(amount: Decimal) -> PaymentAttempt {
    PaymentAttempt::new(PaymentRequest::new(amount, "USD").unwrap())
}

pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        gateway_timeout: Duration::from_secs(2),
        approval_timeout: Duration::from_secs(2),
    }
}

pub fn coordinator_with(
    gateway: &ScriptedOrderGateway,
    handoff: ApprovalHandoffBox,
    journal: &InMemoryJournal,
    config: CoordinatorConfig,
) -> TransactionCoordinator {
    TransactionCoordinator::new(
        Box::new(gateway.clone()),
        handoff,
        Box::new(journal.clone()),
        config,
    )
}

pub fn requests_csv(rows: &[&str]) -> tempfile::NamedTempFile {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "attempt, amount, currency").unwrap();
    for row in rows {
        writeln!(csv, "{}", row).unwrap();
    }
    csv
}
