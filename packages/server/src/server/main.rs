// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use product_extraction::{CompletionService, OpenAICompletion, PipelineConfig, ProductExtractor};
use server_core::auth::{JwtIdentityResolver, JwtService};
use server_core::server::{build_app, AppState};
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,product_extraction=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting product extraction API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Generative fallback is optional
    let completion = match OpenAICompletion::from_env() {
        Some(client) => {
            tracing::info!(model = %client.model(), "Generative fallback enabled");
            let client = client
                .with_timeout(config.request_timeout)
                .context("Failed to build completion client")?;
            Some(Arc::new(client) as Arc<dyn CompletionService>)
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, generative fallback disabled");
            None
        }
    };

    let pipeline_config = PipelineConfig::new().with_fetch_timeout(config.fetch_timeout);
    let extractor = ProductExtractor::from_config(&pipeline_config, completion)
        .context("Failed to build extraction pipeline")?;

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let identity = JwtIdentityResolver::new(jwt_service, config.admin_identifiers.clone());

    // Build application
    let state = AppState::new(Arc::new(extractor), Arc::new(identity));
    let app = build_app(state, &config.allowed_origins, config.request_timeout);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
