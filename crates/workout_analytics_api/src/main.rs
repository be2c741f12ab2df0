use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;
use workout_analytics::RowSource;
use workout_analytics::config::Config;
use workout_analytics::http_client::ReqwestRowSource;
use workout_analytics::store::{InMemoryReportStore, ReportStore, SqliteReportStore};
use workout_analytics_api::{AppState, router};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Log filter from `WORKOUT_ANALYTICS_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("WORKOUT_ANALYTICS_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "workout-analytics: log filter");

    let config = Config::from_env().context("reading configuration")?;
    let handle = PrometheusBuilder::new().install_recorder()?;

    let rows: Arc<dyn RowSource> = Arc::new(ReqwestRowSource::new(
        &config.core_api_base,
        config.upstream_timeout,
    )?);
    let store: Arc<dyn ReportStore> = match &config.reports_db_path {
        Some(path) => Arc::new(SqliteReportStore::open(path)?),
        None => {
            tracing::warn!("REPORTS_DB_PATH not set; report history is kept in memory");
            Arc::new(InMemoryReportStore::new())
        }
    };

    let state = Arc::new(AppState::new(rows, store).with_metrics(handle));
    let app = router(state, config.request_timeout);

    let addr = config.address;
    info!(%addr, core_api = %config.core_api_base, "starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to install ctrl+c handler: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
