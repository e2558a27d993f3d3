// Main entry point for API server

use anyhow::{Context, Result};
use portal_core::kernel::scheduled_tasks::start_scheduler;
use portal_core::server::{build_app, build_server_deps};
use portal_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,portal_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Agent Portal API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    if config.otp_fixed_code.is_some() && !config.development {
        tracing::warn!("OTP_FIXED_CODE is ignored outside development");
    }
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let port = config.port;
    let deps = build_server_deps(config, pool).context("Failed to build dependencies")?;

    // Start scheduled tasks (expired OTP cleanup)
    let _scheduler = start_scheduler(deps.otps.clone())
        .await
        .context("Failed to start scheduler")?;

    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/ping", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
