pub mod file_store;
pub mod memory;


pub use file_store::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use trendwatch_core::{DailyDataset, KeywordConfig, StorageError};

/// Key-value persistence for per-day datasets and the keyword config.
///
/// Loads of absent data return an empty dataset or the default config.
/// Errors are reserved for storage that exists but cannot be read or written.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn load_daily_dataset(&self, date_key: &str) -> Result<DailyDataset, StorageError>;

    async fn save_daily_dataset(
        &self,
        date_key: &str,
        dataset: &DailyDataset,
    ) -> Result<(), StorageError>;

    async fn load_config(&self) -> Result<KeywordConfig, StorageError>;

    async fn save_config(&self, config: &KeywordConfig) -> Result<(), StorageError>;
}

/// Accepts only calendar dates in `YYYY-MM-DD` form.
pub fn validate_date_key(date_key: &str) -> Result<(), StorageError> {
    let valid = date_key.len() == 10 && NaiveDate::parse_from_str(date_key, "%Y-%m-%d").is_ok();
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidDateKey {
            date: date_key.to_string(),
        })
    }
}
