//! Domain Trust API Server
//!
//! Admin registry and email-validation API for Volunteer Central hour
//! verification, built with axum and tokio. The registry is the durable
//! record; the classifier's reference sets are rebuilt from static data and
//! the remote blocklist at startup.

use axum::Router;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trust_core::verifier::{ListVerifyClient, MailboxVerifier, NullVerifier};
use trust_core::{DisposableDomainSet, DomainClassifier};

mod auth;
mod config;
mod db;
mod error;
mod routes;

use config::AppConfig;
use db::DomainStore;

/// Shared application state
pub struct AppState {
    pub classifier: Arc<DomainClassifier>,
    pub disposable: DisposableDomainSet,
    pub store: DomainStore,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(&config)?;

    info!("Starting Domain Trust API v{}", env!("CARGO_PKG_VERSION"));

    // Connect to the registry database and apply migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await
        .map_err(|e| format!("Failed to connect to registry database: {e}"))?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let store = DomainStore::new(pool);

    // Build the classification engine
    let trust_config = config.classification.to_trust_config();
    let disposable = DisposableDomainSet::new(&trust_config)
        .map_err(|e| format!("Failed to initialize disposable-domain set: {e}"))?;

    if config.classification.preload_on_start {
        let preloader = disposable.clone();
        tokio::spawn(async move { preloader.preload().await });
    }

    let verifier: Arc<dyn MailboxVerifier> = match &config.verification.api_key {
        Some(key) => Arc::new(ListVerifyClient::new(
            config.verification.endpoint.clone(),
            key.clone(),
            Duration::from_millis(config.verification.timeout_ms),
        )?),
        None => {
            warn!("No verification provider key configured; external fallback tier disabled");
            Arc::new(NullVerifier)
        }
    };

    let classifier = DomainClassifier::from_parts(
        disposable.clone(),
        Arc::new(store.clone()),
        verifier,
    );

    info!(
        "Classifier initialized: {} disposable domains bundled, cache {}",
        disposable.domain_count(),
        disposable.state().as_str()
    );

    let app_state = Arc::new(AppState {
        classifier: Arc::new(classifier),
        disposable,
        store,
        config: Arc::new(config.clone()),
    });

    let app = create_router(app_state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check available at http://{}/health", addr);
    info!("Admin domain API at http://{}/domains", addr);
    info!("Validation API at http://{}/validate-email-domain", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Create the main application router
fn create_router(state: Arc<AppState>) -> Router {
    routes::build_routes(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                ])
                .allow_headers(tower_http::cors::Any),
        )
        .layer(CompressionLayer::new())
}

/// Layer configuration sources: defaults, then an optional Config.toml,
/// then TRUST_API_-prefixed environment variables.
fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if std::path::Path::new("Config.toml").exists() {
        figment = figment.merge(Toml::file("Config.toml"));
    }

    figment = figment.merge(Env::prefixed("TRUST_API_").split("_"));

    let config: AppConfig = figment.extract()?;

    Ok(config)
}

/// Initialize tracing with the configured filter, JSON-formatted when
/// requested for production log shipping.
fn init_tracing(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}

/// Resolve on SIGINT or SIGTERM so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
