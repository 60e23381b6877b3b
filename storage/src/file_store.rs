use crate::{validate_date_key, Persistence};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use trendwatch_core::{DailyDataset, KeywordConfig, StorageError};

const DATASET_DIR: &str = "job_trend_data";
const CONFIG_FILE: &str = "config.json";

/// JSON files under a data directory:
///
/// ```text
/// <data_dir>/config.json
/// <data_dir>/job_trend_data/2024-09-01.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dataset_path(&self, date_key: &str) -> PathBuf {
        self.data_dir
            .join(DATASET_DIR)
            .join(format!("{}.json", date_key))
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// `None` when the file is missing or does not parse.
    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Replaces `path` in one step: write a sibling temp file, then rename.
    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
        let write_failed = |reason: String| StorageError::WriteFailed {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(e.to_string()))?;
        }

        let body = serde_json::to_string_pretty(value).map_err(|e| write_failed(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, body)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_failed(e.to_string()));
        }

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl Persistence for JsonFileStore {
    async fn load_daily_dataset(&self, date_key: &str) -> Result<DailyDataset, StorageError> {
        validate_date_key(date_key)?;
        let dataset = Self::read_json(&self.dataset_path(date_key)).await?;
        Ok(dataset.unwrap_or_default())
    }

    async fn save_daily_dataset(
        &self,
        date_key: &str,
        dataset: &DailyDataset,
    ) -> Result<(), StorageError> {
        validate_date_key(date_key)?;
        Self::write_json(&self.dataset_path(date_key), dataset).await
    }

    async fn load_config(&self) -> Result<KeywordConfig, StorageError> {
        let config = Self::read_json(&self.config_path()).await?;
        Ok(config.unwrap_or_default())
    }

    async fn save_config(&self, config: &KeywordConfig) -> Result<(), StorageError> {
        Self::write_json(&self.config_path(), config).await
    }
}
