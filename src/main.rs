use anyhow::Context;
use background_service::Tracker;
use bilibili_client::BilibiliClient;
use std::path::PathBuf;
use std::sync::Arc;
use storage::JsonFileStore;
use tokio_util::sync::CancellationToken;
use trendwatch_core::{ErrorExt, Settings, SystemClock};

const SETTINGS_ENV: &str = "TRENDWATCH_SETTINGS";

fn load_settings() -> anyhow::Result<Settings> {
    let Some(path) = std::env::var_os(SETTINGS_ENV).map(PathBuf::from) else {
        return Ok(Settings::default());
    };

    let settings = match Settings::load(&path) {
        Ok(settings) => settings,
        Err(e) => {
            e.log_warn();
            tracing::warn!("Falling back to default settings");
            Settings::default()
        }
    };
    settings
        .validate()
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "trendwatch=info,background_service=info,bilibili_client=info,storage=info".into()
            }),
        )
        .init();

    tracing::info!("Starting Trendwatch - Bilibili job-search trend tracker");

    let settings = load_settings()?;
    let clock = Arc::new(SystemClock);
    let client = BilibiliClient::new(&settings, clock.clone())
        .context("failed to build the Bilibili client")?;
    let store = JsonFileStore::new(settings.data_dir.clone());
    tracing::info!("Data directory: {}", store.data_dir().display());

    let tracker = Tracker::new(Arc::new(client), Arc::new(store), clock, settings);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current keyword");
            on_interrupt.cancel();
        }
    });

    let outcome = tracker.run_cycle_with(None, cancel).await;

    println!("Rankings for {} ({} posts)", outcome.date, outcome.rankings.len());
    for (position, post) in outcome.rankings.iter().take(10).enumerate() {
        println!(
            "{:>2}. [{:.0}] {} - {}",
            position + 1,
            post.hot_score,
            post.title,
            post.url
        );
    }

    if !outcome.success {
        anyhow::bail!(outcome
            .error
            .unwrap_or_else(|| "cycle did not complete".to_string()));
    }
    Ok(())
}
