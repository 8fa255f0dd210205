use crate::domain::order::{AttemptId, OrderId};
use crate::error::Result;
use crate::infrastructure::reporters::ReportedOutcome;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OutcomeRow<'a> {
    attempt: &'a str,
    outcome: String,
    order_id: Option<&'a str>,
    capture_id: Option<&'a str>,
    error: Option<&'a str>,
}

/// Writes one CSV row per reporter notification.
///
/// The `outcome` column is `succeeded` or the failure kind, e.g. `cancelled`.
/// A success notification only names the capture, so the caller supplies the
/// order id from the journal.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_reported(
        &mut self,
        attempt: &AttemptId,
        reported: &ReportedOutcome,
        order_id: Option<&OrderId>,
    ) -> Result<()> {
        let row = match reported {
            ReportedOutcome::Success(capture_id) => OutcomeRow {
                attempt: attempt.as_str(),
                outcome: "succeeded".to_string(),
                order_id: order_id.map(|o| o.as_str()),
                capture_id: Some(capture_id.as_str()),
                error: None,
            },
            ReportedOutcome::Failure(failure) => OutcomeRow {
                attempt: attempt.as_str(),
                outcome: failure.kind.to_string(),
                order_id: failure.order_id.as_ref().or(order_id).map(|o| o.as_str()),
                capture_id: None,
                error: Some(failure.detail.as_str()),
            },
        };
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::CaptureId;
    use crate::domain::transaction::Failure;
    use crate::error::ErrorKind;

    #[test]
    fn test_writes_header_and_rows() {
        let mut buf = Vec::new();
        {
            let mut writer = OutcomeWriter::new(&mut buf);
            writer
                .write_reported(
                    &AttemptId::new("a1"),
                    &ReportedOutcome::Success(CaptureId::new("C1")),
                    Some(&OrderId::new("O1")),
                )
                .unwrap();
            writer
                .write_reported(
                    &AttemptId::new("a2"),
                    &ReportedOutcome::Failure(Failure::new(
                        ErrorKind::Cancelled,
                        Some(OrderId::new("O2")),
                        "approval timed out",
                    )),
                    None,
                )
                .unwrap();
            writer.flush().unwrap();
        }

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "attempt,outcome,order_id,capture_id,error");
        assert_eq!(lines[1], "a1,succeeded,O1,C1,");
        assert_eq!(lines[2], "a2,cancelled,O2,,approval timed out");
    }
}
