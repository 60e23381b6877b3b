use crate::progress::ProgressSender;
use crate::tracker::{CycleOutcome, Tracker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use trendwatch_core::{CoreError, ErrorExt, KeywordConfig, PostRecord};

/// Request/response envelope handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: &CoreError) -> Self {
        error.log_error();
        Self {
            success: false,
            data: None,
            error: Some(error.user_friendly_message()),
        }
    }
}

/// Operations exposed to a UI: read rankings, trigger a refresh, and read or
/// replace the keyword list.
pub struct TrendService {
    tracker: Arc<Tracker>,
}

impl TrendService {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    /// Rankings for `date` (`YYYY-MM-DD`), or for today when `None`.
    /// Read-only: the stored dataset is not modified.
    pub async fn get_rankings(&self, date: Option<&str>) -> ServiceResponse<Vec<PostRecord>> {
        let clock = self.tracker.clock();
        let date = date.map(str::to_string).unwrap_or_else(|| clock.today_key());

        match self.tracker.store().load_daily_dataset(&date).await {
            Ok(dataset) => ServiceResponse::ok(self.tracker.engine().rank(&dataset, clock.now())),
            Err(e) => ServiceResponse::failure(&CoreError::from(e)),
        }
    }

    pub async fn refresh(&self, progress: Option<ProgressSender>) -> ServiceResponse<CycleOutcome> {
        let outcome = self.tracker.run_cycle(progress).await;
        ServiceResponse {
            success: outcome.success,
            error: outcome.error.clone(),
            data: Some(outcome),
        }
    }

    pub async fn get_config(&self) -> ServiceResponse<KeywordConfig> {
        match self.tracker.store().load_config().await {
            Ok(config) => ServiceResponse::ok(config),
            Err(e) => ServiceResponse::failure(&CoreError::from(e)),
        }
    }

    pub async fn save_config(&self, config: KeywordConfig) -> ServiceResponse<()> {
        match self.tracker.store().save_config(&config).await {
            Ok(()) => {
                info!("Saved {} keywords", config.keywords.len());
                ServiceResponse::ok(())
            }
            Err(e) => ServiceResponse::failure(&CoreError::from(e)),
        }
    }
}
