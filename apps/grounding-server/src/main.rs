//! Grounding server
//!
//! JSON front door used by the document review web application. Provides
//! REST API endpoints for:
//!
//! - Locating a text fragment in a document
//! - Grounding extracted fields against page content
//! - Multi-agent extraction across the configured AI providers
//! - Agreement classification, default consensus and reviewer overrides
//!
//! Documents arrive either as page content already extracted by the browser
//! (pdf.js text items) or as base64 PDF bytes decoded server-side.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use agent_orchestrator::{build_providers, ExtractionProvider, ProviderConfig};
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod document;
mod error;
#[cfg(test)]
mod tests;

use api::{
    handle_consensus, handle_extract, handle_ground, handle_health, handle_list_providers,
    handle_locate, handle_override,
};
use config::Config;

/// Command-line arguments for the grounding server
#[derive(Parser, Debug)]
#[command(name = "grounding-server")]
#[command(about = "Source grounding and multi-agent consensus server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// TOML file with grounding settings and `[[providers]]` entries
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Pages searched per lookup; overrides the config file
    #[arg(long)]
    max_pages: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Providers in config order
    pub providers: Arc<Vec<Arc<dyn ExtractionProvider>>>,
    /// Config entries behind `providers`, for listing
    pub provider_configs: Arc<Vec<ProviderConfig>>,
    /// Default page limit when a request does not set one
    pub max_pages: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let providers =
            build_providers(&config.providers).context("Failed to build AI providers")?;

        Ok(Self {
            providers: Arc::new(providers),
            provider_configs: Arc::new(config.providers.clone()),
            max_pages: config.grounding.max_pages,
        })
    }
}

/// API routes without middleware
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // API endpoints
        .route("/api/providers", get(handle_list_providers))
        .route("/api/locate", post(handle_locate))
        .route("/api/ground", post(handle_ground))
        .route("/api/extract", post(handle_extract))
        .route("/api/consensus", post(handle_consensus))
        .route("/api/consensus/override", post(handle_override))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting grounding server on {}:{}", args.host, args.port);

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(max_pages) = args.max_pages {
        config.grounding.max_pages = max_pages;
    }
    config.validate()?;

    let state = AppState::from_config(&config)?;
    if state.providers.is_empty() {
        warn!("No AI providers configured; /api/extract will be rejected");
    }

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .context("Failed to create rate limiter config")?,
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes()
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        )
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!(
        "Providers: {}, max pages: {}",
        config.providers.len(),
        config.grounding.max_pages
    );

    // The rate limiter keys on the peer address
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
