//! # vadm-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the verifier administration service.
//! Binds to a configurable port (default 8080).

use vadm_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let port = config.port;

    // Initialize the database pool and bootstrap the schema.
    let db = vadm_api::db::init_pool().map_err(|e| {
        tracing::error!("database initialization failed: {e}");
        e
    })?;
    vadm_api::db::ensure_schema(&db).await.map_err(|e| {
        tracing::error!("schema bootstrap failed: {e}");
        e
    })?;

    // Directory client is optional: without it, user endpoints return 503.
    let directory = match vadm_directory_client::DirectoryConfig::from_env() {
        Ok(dir_config) => {
            tracing::info!("directory client configured");
            Some(vadm_directory_client::DirectoryClient::new(dir_config)?)
        }
        Err(e) => {
            tracing::warn!("directory client not configured: {e}. User endpoints will return 503.");
            None
        }
    };

    // Credential client is optional: without it, verifier issuance and
    // revocation return 503.
    let credentials = match vadm_credential_client::CredentialConfig::from_env() {
        Ok(cred_config) => {
            tracing::info!("credential client configured");
            Some(vadm_credential_client::CredentialClient::new(cred_config)?)
        }
        Err(e) => {
            tracing::warn!(
                "credential client not configured: {e}. Verifier issuance will return 503."
            );
            None
        }
    };

    let state = AppState {
        db,
        directory,
        credentials,
        config,
    };
    let app = vadm_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("verifier administration API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
