use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use family_harmony_api::{
    config::Config,
    routes::{create_router, AppState},
    services::{CsvRecordStore, RecommendationService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "family_harmony_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        data_path = %config.data_path,
        new_data_path = %config.new_data_path,
        "Configuration loaded"
    );

    // The model must be trained before the listener accepts traffic
    let recommender = RecommendationService::bootstrap(&config.data_path, config.model_params())
        .await
        .context("Failed to initialise the recommendation service")?;

    let state = AppState {
        recommender,
        record_store: Arc::new(CsvRecordStore::new(&config.new_data_path)),
        default_top_k: config.default_top_k,
    };

    let app = create_router(Arc::new(state));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
