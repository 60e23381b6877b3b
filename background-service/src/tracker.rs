use crate::progress::{emit, ProgressEvent, ProgressSender, CANCELLED_LABEL, DONE_LABEL};
use ranking_engine::RankingEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::Persistence;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use trendwatch_core::{
    Clock, CoreError, DailyDataset, ErrorExt, KeywordConfig, PostRecord, PostSource,
    SearchOptions, SearchOrder, Settings,
};
use uuid::Uuid;

pub const CYCLE_BUSY: &str = "cycle already in progress";

/// How many ranked posts are written to the log after a cycle.
const REPORT_SIZE: usize = 10;

/// Result of one pass over the keyword list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub success: bool,
    pub rankings: Vec<PostRecord>,
    pub date: String,
    pub error: Option<String>,
    /// Keywords whose search was attempted, failed ones included.
    pub keywords_processed: usize,
    pub keywords_failed: usize,
}

impl CycleOutcome {
    fn busy(date: String) -> Self {
        Self {
            success: false,
            rankings: Vec::new(),
            date,
            error: Some(CYCLE_BUSY.to_string()),
            keywords_processed: 0,
            keywords_failed: 0,
        }
    }
}

/// Runs collection cycles: search every keyword, merge into today's
/// dataset, persist, rank.
pub struct Tracker {
    source: Arc<dyn PostSource>,
    store: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
    engine: RankingEngine,
    settings: Settings,
    gate: Mutex<()>,
}

impl Tracker {
    pub fn new(
        source: Arc<dyn PostSource>,
        store: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            engine: RankingEngine::from_settings(&settings),
            settings,
            gate: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &RankingEngine {
        &self.engine
    }

    pub fn store(&self) -> Arc<dyn Persistence> {
        self.store.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    pub async fn run_cycle(&self, progress: Option<ProgressSender>) -> CycleOutcome {
        self.run_cycle_with(progress, CancellationToken::new()).await
    }

    /// Runs one cycle unless another is in flight, in which case it returns
    /// a busy outcome immediately. Never panics or propagates an error.
    pub async fn run_cycle_with(
        &self,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> CycleOutcome {
        let date = self.clock.today_key();

        let Ok(_guard) = self.gate.try_lock() else {
            CoreError::Busy {
                message: CYCLE_BUSY.to_string(),
            }
            .log_warn();
            return CycleOutcome::busy(date);
        };

        let span = info_span!("cycle", id = %Uuid::new_v4(), date = %date);
        self.execute(date, progress.as_ref(), &cancel)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        date: String,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> CycleOutcome {
        let mut dataset = self.load_dataset(&date).await;
        let keywords = self.load_config().await.effective_keywords();
        let total = keywords.len();
        info!(
            "Starting cycle over {} keywords, {} posts already stored",
            total,
            dataset.len()
        );

        let options = SearchOptions {
            order: SearchOrder::PublishDate,
            page_size: self.settings.page_size,
            ..Default::default()
        };

        let mut processed = 0;
        let mut failed = 0;
        let mut cancelled = false;

        for (index, keyword) in keywords.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            emit(progress, ProgressEvent::new(index + 1, total, keyword.as_str()));

            match self.source.search(keyword, &options).await {
                Ok(posts) => {
                    let found = posts.len();
                    let stats = self.engine.merge(posts, &mut dataset, self.clock.now());
                    info!(
                        "[{}/{}] {:?}: {} found, {} new",
                        index + 1,
                        total,
                        keyword,
                        found,
                        stats.inserted
                    );
                }
                Err(e) => {
                    failed += 1;
                    error!("[{}/{}] {:?} failed: {}", index + 1, total, keyword, e);
                }
            }
            processed += 1;

            if index + 1 < total {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = sleep(self.settings.pacing()) => {}
                }
            }
        }

        if let Err(e) = self.store.save_daily_dataset(&date, &dataset).await {
            CoreError::from(e).log_error();
        }

        let rankings = self.engine.rank(&dataset, self.clock.now());
        self.report(&rankings);

        let (success, error, label) = if cancelled {
            let err = CoreError::Cancelled {
                operation: "cycle".to_string(),
            };
            warn!("Cycle cancelled after {} of {} keywords", processed, total);
            (false, Some(err.to_string()), CANCELLED_LABEL)
        } else {
            info!(
                "Cycle complete: {} keywords, {} failed, {} posts stored, {} ranked",
                processed,
                failed,
                dataset.len(),
                rankings.len()
            );
            (true, None, DONE_LABEL)
        };
        let current = if cancelled { processed } else { total };
        emit(progress, ProgressEvent::new(current, total, label));

        CycleOutcome {
            success,
            rankings,
            date,
            error,
            keywords_processed: processed,
            keywords_failed: failed,
        }
    }

    async fn load_dataset(&self, date: &str) -> DailyDataset {
        match self.store.load_daily_dataset(date).await {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!("Could not load dataset for {}, starting empty: {}", date, e);
                DailyDataset::new()
            }
        }
    }

    async fn load_config(&self) -> KeywordConfig {
        match self.store.load_config().await {
            Ok(config) => config,
            Err(e) => {
                warn!("Could not load keyword config, using defaults: {}", e);
                KeywordConfig::default()
            }
        }
    }

    fn report(&self, rankings: &[PostRecord]) {
        for (position, post) in rankings.iter().take(REPORT_SIZE).enumerate() {
            info!(
                "#{:<2} {:>8.0}  {} / {}  views={} likes={} favorites={}  {}",
                position + 1,
                post.hot_score,
                post.title,
                post.author,
                post.metrics.views,
                post.metrics.likes,
                post.metrics.favorites,
                post.url
            );
        }
    }
}
