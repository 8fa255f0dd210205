use crate::domain::money::PaymentRequest;
use crate::domain::order::AttemptId;
use crate::domain::transaction::PaymentAttempt;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One input row: `attempt, amount, currency`. An empty attempt column gets
/// a generated id.
#[derive(Debug, Deserialize)]
struct RequestRow {
    attempt: Option<String>,
    amount: Decimal,
    currency: String,
}

impl RequestRow {
    fn into_attempt(self) -> Result<PaymentAttempt> {
        let attempt = PaymentAttempt::new(PaymentRequest::new(self.amount, &self.currency)?);
        Ok(match self.attempt.filter(|a| !a.is_empty()) {
            Some(id) => attempt.with_attempt_id(AttemptId::new(id)),
            None => attempt,
        })
    }
}

/// Reads payment requests from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<PaymentAttempt>`, each with a fresh idempotency key.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates requests.
    pub fn attempts(self) -> impl Iterator<Item = Result<PaymentAttempt>> {
        self.reader
            .into_deserialize::<RequestRow>()
            .map(|row| row.map_err(PaymentError::from)?.into_attempt())
    }
}
