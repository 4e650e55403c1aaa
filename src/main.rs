use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod audit;
mod clock;
mod config;
mod error;
mod handlers;
mod models;
mod recorder;
mod service;
mod shortcode;
mod stats;
mod store;

use audit::{AuditLog, AuditSink, RemoteSink, TracingSink};
use service::LinkService;
use shortcode::RandomCodeGenerator;
use store::LinkStore;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: config::AppConfig,
    pub service: LinkService,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent, env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortlink=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting shortlink on {}:{}", config.host, config.port);
    tracing::info!("Base URL: {}", config.base_url);

    let sink: Arc<dyn AuditSink> = match &config.audit_log_url {
        Some(url) => {
            tracing::info!("Shipping audit records to {}", url);
            Arc::new(RemoteSink::new(
                url.clone(),
                config.audit_log_token.clone(),
                config.audit_log_timeout,
            )?)
        }
        None => Arc::new(TracingSink),
    };

    let service = LinkService::new(LinkStore::new())
        .with_generator(Arc::new(RandomCodeGenerator::new(config.shortcode_length)))
        .with_default_validity(config.default_validity_minutes)
        .with_max_attempts(config.max_allocation_attempts)
        .with_audit(AuditLog::new(sink));

    if let Some(every) = config.purge_interval {
        spawn_purge_task(service.store().clone(), every);
    }

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { config, service });

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically drop expired links so memory does not grow without bound.
/// Purged codes become free for new links.
fn spawn_purge_task(store: LinkStore, every: std::time::Duration) {
    tracing::info!("Purging expired links every {:?}", every);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.purge_expired(chrono::Utc::now());
            if removed > 0 {
                tracing::info!("Purged {} expired link(s), {} remain", removed, store.len());
            }
        }
    });
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness probe for the front end
        .route("/", get(|| async { axum::http::StatusCode::OK }))
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route("/shorturls", post(handlers::shorturls::create))
        .route("/shorturls/:code", get(handlers::shorturls::stats))
        // Short-link redirect; static routes above take priority
        .route("/:code", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) fn test_state() -> Arc<AppState> {
    test_state_with(LinkService::new(LinkStore::new()))
}

#[cfg(test)]
pub(crate) fn test_state_with(link_service: LinkService) -> Arc<AppState> {
    let config = config::AppConfig {
        host: "127.0.0.1".into(),
        port: 8080,
        base_url: "http://localhost:8080".into(),
        default_validity_minutes: service::DEFAULT_VALIDITY_MINUTES,
        max_allocation_attempts: service::DEFAULT_MAX_ATTEMPTS,
        shortcode_length: shortcode::DEFAULT_LEN,
        audit_log_url: None,
        audit_log_token: None,
        audit_log_timeout: std::time::Duration::from_secs(3),
        purge_interval: None,
    };
    Arc::new(AppState {
        config,
        service: link_service,
    })
}
