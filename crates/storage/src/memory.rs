use std::sync::Mutex;

use crate::error::StorageResult;
use crate::snapshot::MessageSnapshot;
use crate::SnapshotStore;

/// In-memory snapshot store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: Mutex<Vec<MessageSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with existing history.
    pub fn with_records(records: Vec<MessageSnapshot>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Current stored records; test-side peek without going through `load`.
    pub fn records(&self) -> Vec<MessageSnapshot> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &[MessageSnapshot]) -> StorageResult<()> {
        if let Ok(mut records) = self.records.lock() {
            *records = snapshot.to_vec();
        }
        Ok(())
    }

    fn load(&self) -> Vec<MessageSnapshot> {
        self.records()
    }

    fn wipe(&self) -> StorageResult<()> {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
        Ok(())
    }
}
