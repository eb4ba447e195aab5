use anyhow::Result;
use solar_energy_manager::{api, config::AppConfig, manager, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cfg = AppConfig::load()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "Server binding to 0.0.0.0 - service will be accessible from the network. \
            Bind to 127.0.0.1 unless behind a firewall/reverse proxy."
        );
    }

    let state = manager::AppState::new(cfg.clone());
    let app = api::router(state.clone(), &cfg);

    manager::spawn_manager_tasks(&state);

    let addr = cfg.server.socket_addr()?;
    info!(%addr, poll_seconds = cfg.engine.poll_seconds, "starting solar energy manager");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
