use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use api_shared::SessionVerifier;
use koderstore_core::{CoreConfig, StorageService};

const ENV_SESSION_SECRET: &str = "KODERSTORE_SESSION_SECRET";
const ENV_REST_ADDR: &str = "KODERSTORE_REST_ADDR";
const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Main entry point for Koderstore
///
/// Resolves configuration once, builds the storage service and serves the REST API until
/// interrupted.
///
/// # Environment Variables
/// - `KODERSTORE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `KODERSTORE_SESSION_SECRET`: key used to verify session cookies (required)
/// - `KODERSTORE_BACKEND`: `github` (default) or `memory`
/// - `GITHUB_TOKEN`, `GITHUB_STORAGE_OWNER`, `GITHUB_STORAGE_REPO`: storage repository (github backend)
/// - `ADMIN_DISCORD_IDS`: comma-separated administrator ids
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration is missing or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("koderstore_run=info".parse()?)
                .add_directive("koderstore_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())
        .context("invalid storage configuration")?;
    let service = StorageService::from_config(&cfg)?;

    let secret = std::env::var(ENV_SESSION_SECRET)
        .with_context(|| format!("{ENV_SESSION_SECRET} must be set"))?;
    let sessions = SessionVerifier::new(secret)?;

    let rest_addr = std::env::var(ENV_REST_ADDR).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    tracing::info!("-- Starting Koderstore REST API on {}", rest_addr);

    let app = api_rest::router(AppState::new(service, sessions));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!("Koderstore stopped");
    Ok(())
}
