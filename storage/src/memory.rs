use crate::{validate_date_key, Persistence};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use trendwatch_core::{DailyDataset, KeywordConfig, StorageError};

/// In-process store. Writes can be made to fail to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: RwLock<HashMap<String, DailyDataset>>,
    config: RwLock<Option<KeywordConfig>>,
    fail_writes: AtomicBool,
    dataset_saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KeywordConfig) -> Self {
        Self {
            config: RwLock::new(Some(config)),
            ..Default::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful dataset saves.
    pub fn dataset_saves(&self) -> usize {
        self.dataset_saves.load(Ordering::SeqCst)
    }

    fn check_writable(&self, what: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                path: format!("memory:{}", what),
                reason: "writes disabled".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn load_daily_dataset(&self, date_key: &str) -> Result<DailyDataset, StorageError> {
        validate_date_key(date_key)?;
        Ok(self
            .datasets
            .read()
            .await
            .get(date_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_daily_dataset(
        &self,
        date_key: &str,
        dataset: &DailyDataset,
    ) -> Result<(), StorageError> {
        validate_date_key(date_key)?;
        self.check_writable(date_key)?;
        self.datasets
            .write()
            .await
            .insert(date_key.to_string(), dataset.clone());
        self.dataset_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_config(&self) -> Result<KeywordConfig, StorageError> {
        Ok(self.config.read().await.clone().unwrap_or_default())
    }

    async fn save_config(&self, config: &KeywordConfig) -> Result<(), StorageError> {
        self.check_writable("config")?;
        *self.config.write().await = Some(config.clone());
        Ok(())
    }
}
