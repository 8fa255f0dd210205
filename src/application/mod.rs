//! Application layer containing the transaction orchestration.
//!
//! This module defines the `TransactionCoordinator`, the entry point for
//! running a payment attempt, together with the in-flight guard, the
//! exactly-once reporter wrapper and the cancellation signal it relies on.

pub mod cancel;
pub mod coordinator;
pub mod guard;
pub mod reporter;
