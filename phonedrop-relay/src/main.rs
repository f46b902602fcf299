use clap::Parser;
use phonedrop_relay::{create_signaling_route, LogConfig, RelayConfig, RelayHandle};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RelayConfig::parse();
    let log_config = LogConfig::from_relay_config(&config);

    #[cfg(feature = "telemetry")]
    phonedrop_relay::infrastructure::telemetry::init_telemetry(&log_config)?;
    #[cfg(not(feature = "telemetry"))]
    log_config.init()?;

    let relay = RelayHandle::spawn(&config);
    let app = create_signaling_route(relay, &config);

    let listener = TcpListener::bind(config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        inactivity_timeout = ?config.inactivity_timeout(),
        shards = config.shard_count(),
        "Relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay stopped");
    #[cfg(feature = "telemetry")]
    phonedrop_relay::infrastructure::telemetry::shutdown_telemetry();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
