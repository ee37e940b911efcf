mod config;

use std::sync::Arc;

use tracing::{error, info, warn};

use leafcare_api::ai::TextModel;
use leafcare_api::detection::Classifier;
use leafcare_api::events::Revalidator;
use leafcare_api::router::router;
use leafcare_api::state::{AppState, AppStateInner};
use leafcare_api::storage::ObjectStore;
use leafcare_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leafcare=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if config.ai_api_key.is_none() {
        warn!("GOOGLE_GENERATIVE_AI_API_KEY not set, AI answers will fail");
    }
    if config.classifier_url.is_none() {
        info!("No classifier configured, disease detection returns a stub result");
    }

    // Init database and storage
    let db = Database::open(&config.db_path)?;
    let storage = ObjectStore::new(config.upload_dir.clone(), &config.public_url).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        storage,
        model: TextModel::new(&config.ai_base_url, &config.ai_model, config.ai_api_key.clone()),
        classifier: Classifier::new(config.classifier_url.clone()),
        revalidator: Revalidator::new(),
    });

    let app = router(state);

    info!("LeafCare server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                wait_for_ctrl_c(ctrl_c).await;
            }
        }
    }
    #[cfg(not(unix))]
    wait_for_ctrl_c(ctrl_c).await;
}

async fn wait_for_ctrl_c(ctrl_c: impl std::future::Future<Output = std::io::Result<()>>) {
    match ctrl_c.await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
