use database::Database;
use dotenv::dotenv;
use shared::AppConfig;
use submission_worker::{ingest_poll, WorkerState};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    tracing::info!("submission-worker starting");

    let config = AppConfig::from_env();
    let db = Database::connect(&config.pg_database_url).await?;
    db.migrate().await?;

    let state = WorkerState::build(&config, db).await?;

    match state.publish.recover_partial_publishes().await {
        Ok(report) => {
            if !report.resumed.is_empty() || !report.failed.is_empty() {
                tracing::info!(resumed = report.resumed.len(), failed = report.failed.len(), "startup publish recovery complete");
            }
        }
        Err(e) => tracing::error!(error = %e, "startup publish recovery failed"),
    }

    tracing::info!(interval = ?state.polling_interval, "entering ingest-status polling loop");
    loop {
        ingest_poll::sweep(&state).await;
        sleep(state.polling_interval).await;
    }
}
