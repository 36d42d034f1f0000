use anyhow::Result;
use nodestats::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let clock = app_config.rollup.day_clock()?;

    let repo = Arc::new(
        stats_repo::StatsRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    repo.init().await?;

    let (owners_tx, owners_rx) = owners::channel(owners::NodeOwners::default());
    match owners::refresh_once(&repo, &owners_tx).await {
        Ok(n) => tracing::info!(owners = n, "owner table loaded"),
        Err(e) => tracing::warn!(error = %e, "initial owner load failed; starting empty"),
    }
    let _refresher = owners::spawn_refresher(
        repo.clone(),
        app_config.rollup.owner_refresh_secs,
        owners_tx,
    );

    if app_config.rollup.backfill_days > 0
        && let Err(e) = backfill::run_backfill(
            repo.clone(),
            &clock,
            app_config.rollup.backfill_days,
            timebucket::now_ms(),
        )
        .await
    {
        tracing::warn!(error = %e, "backfill failed");
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = rollup_worker::spawn(
        repo.clone(),
        owners_rx,
        rollup_worker::RollupWorkerConfig {
            cycle_interval_secs: app_config.rollup.cycle_interval_secs,
            schedule: app_config.rollup.schedule.clone(),
            clock,
        },
        shutdown_rx,
    );

    let poll = Arc::new(sync::PollService::new(
        repo.clone(),
        sync::MemoryDigestStore::new(),
        clock,
        app_config.poll.month_window_days,
    ));
    let app = routes::app(repo, poll, clock);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = worker_handle.await;
        }
    }

    Ok(())
}
