pub mod energy;
pub mod error;
pub mod status;

use axum::{routing::get, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::AppConfig, manager::AppState};

pub fn router(state: AppState, cfg: &AppConfig) -> Router {
    let v1 = Router::new()
        .route("/healthz", get(status::healthz))
        .route("/status", get(status::get_status))
        .route("/statistics/recent", get(status::get_recent_statistics))
        .route(
            "/energy-management",
            get(energy::get_config).put(energy::update_config),
        )
        .route("/energy-management/decision", get(energy::get_decision))
        .route("/energy-management/history", get(energy::get_history))
        .with_state(state);

    let mut router = Router::new().nest("/api/v1", v1);

    if cfg.server.enable_cors {
        use axum::http::Method;
        use tower_http::cors::{Any, CorsLayer};
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::PUT])
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    cfg.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
}
