// In-process violation store. History lives only as long as the store.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ViolationRecord, ViolationStore};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ViolationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViolationStore for MemoryStore {
    async fn append(&self, record: &ViolationRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn history(&self) -> Result<Vec<ViolationRecord>> {
        Ok(self.records.lock().await.clone())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
