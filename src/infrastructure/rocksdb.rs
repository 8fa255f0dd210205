use crate::domain::order::IdempotencyKey;
use crate::domain::ports::TransactionJournal;
use crate::domain::transaction::TransactionRecord;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding one JSON record per idempotency key.
pub const CF_JOURNAL: &str = "journal";

/// A persistent transaction journal backed by RocksDB.
///
/// Records survive restarts, so orders abandoned by a crashed process can
/// still be listed for reconciliation.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbJournal {
    db: Arc<DB>,
}

impl RocksDbJournal {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_journal = ColumnFamilyDescriptor::new(CF_JOURNAL, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_journal])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn journal_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_JOURNAL).ok_or_else(|| {
            PaymentError::IoError(std::io::Error::other("Journal column family not found"))
        })
    }
}

#[async_trait]
impl TransactionJournal for RocksDbJournal {
    async fn record(&self, record: TransactionRecord) -> Result<()> {
        let cf = self.journal_cf()?;
        let value = serde_json::to_vec(&record)?;
        self.db
            .put_cf(cf, record.idempotency_key.as_str().as_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, idempotency_key: &IdempotencyKey) -> Result<Option<TransactionRecord>> {
        let cf = self.journal_cf()?;
        match self.db.get_cf(cf, idempotency_key.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn unsettled(&self) -> Result<Vec<TransactionRecord>> {
        let cf = self.journal_cf()?;
        let mut unsettled = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: TransactionRecord = serde_json::from_slice(&value)?;
            if record.is_unsettled() {
                unsettled.push(record);
            }
        }
        unsettled.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        Ok(unsettled)
    }
}
