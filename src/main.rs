use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dream_proxy::{build_app, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dream_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // -----------------------------
    // Configuration
    // -----------------------------
    let config = AppConfig::from_env()?;
    info!(
        environment = %config.environment,
        llm_provider = config.llm.name(),
        image_provider = config.image.name(),
        "providers resolved"
    );

    let addr = config.bind_addr();
    let app = build_app(AppState::new(config));

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP listening on http://{addr}");
    info!("endpoints: /health, /llm-proxy, /sd-proxy (also under /api)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
