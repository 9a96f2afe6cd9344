use std::sync::Arc;

use anyhow::Context;
use smsgate::{AppState, GatewayConfig, TwilioClient, logging, server};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("failed to load configuration")?;
    logging::init(&config.log_level);

    let provider = TwilioClient::from_config(&config).context("failed to build Twilio client")?;
    let summary = config.provider_summary();
    tracing::info!(
        account = %summary.account,
        from = %summary.from,
        api_base = %summary.api_base,
        "Twilio client ready"
    );

    let validator = config.validator().context("invalid validation settings")?;
    let gateway = config.gateway(Arc::new(provider));
    let router = server::router(AppState::new(validator, gateway));

    let listener = TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;

    server::serve(listener, router, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
