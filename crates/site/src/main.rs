//! Lodge site - public booking pages and the staff console.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - `PostgreSQL` for rooms, reservations, staff accounts and sessions
//! - Background worker delivering booking mail over SMTP
//!
//! Migrations are not run on startup; use `lodge migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use lodge_site::config::SiteConfig;
use lodge_site::db::{self, PgBookingRepository};
use lodge_site::middleware::create_session_layer;
use lodge_site::services::{MailQueue, SmtpMailer, spawn_worker};
use lodge_site::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Route warnings and errors to Sentry as events, lower levels as breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Set up Sentry (when a DSN is configured) and the tracing subscriber.
///
/// The returned guard flushes pending Sentry events when dropped, so it must
/// live until the process exits.
fn init_telemetry(config: &SiteConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config.sentry_environment.clone().map(Into::into),
                attach_stacktrace: true,
                ..Default::default()
            },
        ))
    });

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lodge_site=info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if guard.is_some() {
        tracing::info!(environment = ?config.sentry_environment, "Sentry enabled");
    }
    guard
}

#[tokio::main]
async fn main() {
    let config = SiteConfig::from_env().expect("Failed to load configuration");
    let _sentry = init_telemetry(&config);

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    let mailer = SmtpMailer::new(&config.mail).expect("Failed to configure SMTP transport");
    let (mail, receiver) = MailQueue::new(config.mail.owner.clone());
    let mail_worker = spawn_worker(receiver, Arc::new(mailer));

    let session_layer = create_session_layer(&pool, &config);
    let state = AppState::new(Arc::new(PgBookingRepository::new(pool)), mail);

    let app = lodge_site::router(state, session_layer, &config.static_dir)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, base_url = %config.base_url, "Lodge site listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // The router held the last queue sender; let the worker drain.
    if let Err(e) = mail_worker.await {
        tracing::error!(error = %e, "Mail worker panicked");
    }
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down, finishing in-flight requests");
}
