use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::health::router())
        .merge(handlers::schemas::router())
        .merge(handlers::workflows::router())
        .merge(handlers::objects::router())
        .merge(handlers::submissions::router())
        .merge(handlers::publish::router())
        .merge(handlers::files::router())
        .merge(handlers::rems::router())
        .merge(handlers::auth::router())
}
