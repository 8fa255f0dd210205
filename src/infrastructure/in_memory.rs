use crate::domain::order::IdempotencyKey;
use crate::domain::ports::TransactionJournal;
use crate::domain::transaction::TransactionRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory transaction journal.
///
/// Uses `Arc<RwLock<HashMap<IdempotencyKey, TransactionRecord>>>` so clones
/// share the same records. Suited to tests and single-run batches.
#[derive(Default, Clone)]
pub struct InMemoryJournal {
    records: Arc<RwLock<HashMap<IdempotencyKey, TransactionRecord>>>,
}

impl InMemoryJournal {
    /// Creates a new, empty in-memory journal.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionJournal for InMemoryJournal {
    async fn record(&self, record: TransactionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.idempotency_key.clone(), record);
        Ok(())
    }

    async fn get(&self, idempotency_key: &IdempotencyKey) -> Result<Option<TransactionRecord>> {
        let records = self.records.read().await;
        Ok(records.get(idempotency_key).cloned())
    }

    async fn unsettled(&self) -> Result<Vec<TransactionRecord>> {
        let records = self.records.read().await;
        let mut unsettled: Vec<TransactionRecord> = records
            .values()
            .filter(|r| r.is_unsettled())
            .cloned()
            .collect();
        unsettled.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        Ok(unsettled)
    }
}
