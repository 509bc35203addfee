//! CRM API server.
//!
//! Serves the JSON REST API for contacts, companies, deals, tasks,
//! activities, products, quotes and invoices.
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` via sqlx (schema `crm`)
//! - Opaque bearer tokens, hashed at rest
//! - Local-disk photo storage served under `/storage`
//!
//! Migrations are not run on startup: use `crm-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crm_api::config::{ApiConfig, TlsConfig};
use crm_api::state::AppState;

const DEFAULT_LOG_FILTER: &str = "crm_api=info,tower_http=debug";

/// In-flight requests get this long to finish after a shutdown signal.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Start Sentry when a DSN is configured. The guard flushes events on drop.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Into::into),
        sample_rate: config.sentry_sample_rate,
        traces_sample_rate: config.sentry_traces_sample_rate,
        attach_stacktrace: true,
        send_default_pii: false,
        ..Default::default()
    };
    let guard = sentry::init((dsn, options));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    use tracing::Level;

    match *metadata.level() {
        Level::ERROR | Level::WARN => sentry_tracing::EventFilter::Event,
        Level::INFO | Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the global subscriber: `RUST_LOG` filter, text or JSON output, Sentry.
fn init_tracing(json_logs: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = json_logs.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text = (!json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // The ring provider has to be the process default before rustls is touched.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = ApiConfig::from_env().expect("Failed to load configuration");

    // Sentry goes first so the tracing layer can forward to it.
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.json_logs);

    let pool = crm_api::db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    std::fs::create_dir_all(&config.upload_dir).expect("Failed to create upload directory");

    let addr = config.socket_addr();
    let tls = config.tls.clone();
    let app = crm_api::app(AppState::new(config, pool));

    match tls {
        Some(tls) => serve_https(app, addr, &tls).await,
        None => serve_http(app, addr).await,
    }
}

async fn serve_http(app: Router, addr: SocketAddr) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "crm-api listening on http");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn serve_https(app: Router, addr: SocketAddr, tls: &TlsConfig) {
    let rustls = RustlsConfig::from_pem(
        tls.cert_pem.as_bytes().to_vec(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await
    .expect("Failed to load TLS certificates");
    tracing::info!(%addr, "crm-api listening on https");

    let handle = Handle::new();
    let drain = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
    });

    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("Server error");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
