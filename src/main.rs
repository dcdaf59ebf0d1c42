//! Rideshare API server
//! Mission: Serve the ride-hailing API behind scope-gated bearer tokens

use anyhow::{Context, Result};
use axum::middleware;
use clap::Parser;
use dotenv::dotenv;
use rideshare_backend::{
    api::{self, AppState},
    auth::{scopes::SCOPE_DESCRIPTIONS, CredentialVerifier, SessionIssuer, TokenCodec},
    config::Settings,
    middleware::request_logging,
    store::RideStore,
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let settings = Settings::parse();
    let auth_config = settings.auth_config()?;
    let server_config = settings.server_config();

    info!("🚀 Rideshare API starting");

    let codec = Arc::new(TokenCodec::new(&auth_config));
    let issuer = Arc::new(SessionIssuer::new(codec.clone()));
    let verifier = Arc::new(CredentialVerifier::new(codec));
    info!(
        algorithm = ?auth_config.algorithm,
        ttl_minutes = auth_config.token_ttl.num_minutes(),
        "🔐 Token signing configured"
    );
    for (scope, description) in SCOPE_DESCRIPTIONS {
        info!(scope, description, "Scope registered");
    }

    let store = Arc::new(
        RideStore::new(&server_config.db_path)
            .with_context(|| format!("Failed to open database at {}", server_config.db_path))?,
    );

    let state = AppState::new(store, issuer, verifier);
    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(request_logging))
            .layer(CorsLayer::permissive()),
    );

    let listener = TcpListener::bind(&server_config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", server_config.bind_addr))?;
    info!("🎯 API server listening on {}", server_config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

const DEFAULT_LOG_FILTER: &str = "rideshare_backend=debug,rideshare=debug,tower_http=debug";

/// Initialize tracing with an env-overridable filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate's own .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
