use std::net::SocketAddr;

use axum::http;
use database::Database;
use dotenv::dotenv;

mod handlers;
mod middleware;
mod router;
mod state;

use shared::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();

    let db = Database::connect(&config.pg_database_url).await?;
    db.migrate().await?;

    let app_state = AppState::build(config, db).await?;

    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION, http::header::ACCEPT]);

    let app = router::routes()
        .layer(axum::middleware::from_fn_with_state(app_state.clone(), middleware::auth::auth_middleware))
        .layer(axum::extract::DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("submission-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
