// Main entry point for the course generation server

use std::sync::Arc;

use anyhow::{Context, Result};
use coursegen_core::domains::generation::resume_all;
use coursegen_core::kernel::{db, GenerationSettings, OpenAIContentGenerator, ServerDeps};
use coursegen_core::{server::build_app, Config};
use openai_client::OpenAIClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,coursegen_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting course generation server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = db::connect(&config.database_url, 10).await?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::migrate(&pool).await?;
    tracing::info!("Migrations complete");

    // Content provider
    let mut client = OpenAIClient::new(config.openai_api_key.clone());
    if let Some(base_url) = &config.openai_base_url {
        client = client.with_base_url(base_url.clone());
    }
    let generator = Arc::new(OpenAIContentGenerator::new(
        client,
        config.generation_model.clone(),
        config.max_completion_tokens,
    ));

    let deps = ServerDeps::new(
        pool,
        generator,
        config.generation_concurrency,
        GenerationSettings {
            auto_dispatch: config.auto_dispatch,
            upload_folder: config.upload_folder.clone(),
        },
    );
    tracing::info!(
        owner = deps.ledger.owner_id(),
        concurrency = deps.batch.capacity(),
        model = %config.generation_model,
        "Generation pipeline ready"
    );

    // Resume unfinished jobs in the background
    let resume_deps = deps.clone();
    deps.background.spawn("resume", async move {
        let report = resume_all(&resume_deps).await?;
        tracing::info!(
            resumed = report.total(),
            succeeded = report.succeeded,
            failed = report.failed,
            "Resumed generation work finished"
        );
        Ok(())
    });

    // Build application
    let app = build_app(deps);

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
