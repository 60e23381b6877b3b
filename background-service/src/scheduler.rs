use crate::progress::ProgressSender;
use crate::tracker::Tracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trendwatch_core::CoreError;

/// Runs a cycle on start, then one per polling interval until stopped.
pub struct BackgroundService {
    tracker: Arc<Tracker>,
    polling_interval: Duration,
    progress: Option<ProgressSender>,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundService {
    pub fn new(tracker: Arc<Tracker>, polling_interval: Duration) -> Self {
        Self {
            tracker,
            polling_interval,
            progress: None,
            shutdown: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Progress of every scheduled cycle is forwarded to `sender`.
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub async fn start(&self) -> Result<(), CoreError> {
        if self.shutdown.is_cancelled() {
            return Err(CoreError::Cancelled {
                operation: "background service".to_string(),
            });
        }

        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Err(CoreError::Busy {
                message: "background service already started".to_string(),
            });
        }

        let tracker = self.tracker.clone();
        let interval = self.polling_interval;
        let progress = self.progress.clone();
        let shutdown = self.shutdown.clone();

        info!("Starting background service, polling every {:?}", interval);
        *handle = Some(tokio::spawn(async move {
            loop {
                let outcome = tracker
                    .run_cycle_with(progress.clone(), shutdown.child_token())
                    .await;
                if !outcome.success {
                    warn!(
                        "Scheduled cycle for {} did not complete: {}",
                        outcome.date,
                        outcome.error.as_deref().unwrap_or("unknown")
                    );
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = sleep(interval) => {}
                }
            }
            info!("Background service stopped");
        }));

        Ok(())
    }

    /// Cancels the running cycle (it still persists what it gathered) and
    /// waits for the loop to exit. The service cannot be restarted.
    pub async fn stop(&self) -> Result<(), CoreError> {
        self.shutdown.cancel();

        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            handle.await.map_err(|e| CoreError::Internal {
                message: format!("background task failed: {}", e),
            })?;
        }
        Ok(())
    }
}
