//! services/app/src/bin/juriscan.rs

use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use juriscan_core::{App, AppOptions, AppPorts};
use juriscan_lib::{
    adapters::{DocxTextExtractor, OpenAiAnalysisAdapter, SqliteKvAdapter},
    config::Config,
    error::AppError,
    web::{router, state::AppState},
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting JuriScan...");

    // --- 2. Open Local Storage & Run Migrations ---
    info!("Opening local storage at {}...", config.database_url);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(SqliteKvAdapter::new(pool));
    store.run_migrations().await?;
    info!("Storage migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.analysis_api_key.clone());
    if let Some(base) = &config.analysis_api_base {
        openai_config = openai_config.with_api_base(base.clone());
    }
    let analysis = Arc::new(OpenAiAnalysisAdapter::new(
        Client::with_config(openai_config),
        config.analysis_model.clone(),
    ));

    // --- 4. Load the Application State ---
    let app = App::start(
        AppPorts {
            analysis,
            extractor: Arc::new(DocxTextExtractor::new()),
            store,
        },
        AppOptions {
            os_prefers_dark: config.prefers_dark,
            history_limit: config.history_limit,
            ..AppOptions::default()
        },
    )
    .await;
    let app_state = Arc::new(AppState { app });

    // --- 5. Create the Web Router ---
    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        AppError::Internal(format!("Invalid ALLOWED_ORIGIN '{}': {}", config.allowed_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);
    let app = router(app_state).layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
