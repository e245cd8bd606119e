//! Bus ticket reservation server

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use bus_ticket_server::bookings::hold_sweeper;
use bus_ticket_server::config::Config;
use bus_ticket_server::db;
use bus_ticket_server::middleware::RateLimiter;
use bus_ticket_server::payments::StripeGateway;
use bus_ticket_server::routes::{build_router, HttpOptions};
use bus_ticket_server::state::AppState;
use bus_ticket_server::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting bus ticket server");

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let gateway = Arc::new(
        StripeGateway::new(&config.stripe_api_base, &config.stripe_secret_key)
            .context("Failed to build payment processor client")?,
    );
    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set, payment endpoints will fail");
    }

    let state = AppState::new(store, gateway, &config.jwt_secret, &config.payment_currency);

    let sweeper = match config.booking_hold() {
        Some(hold) => {
            let service = state.booking_service.clone();
            let every = config.sweep_interval();
            Some(tokio::spawn(async move {
                hold_sweeper(service, hold, every).await;
            }))
        }
        None => {
            tracing::info!("BOOKING_HOLD_MINUTES is 0, hold sweeper disabled");
            None
        }
    };

    let limiter = RateLimiter::new(config.rate_limit_rps);
    let eviction = limiter.spawn_eviction(Duration::from_secs(300));

    let app = build_router(state, limiter, &HttpOptions::from_config(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Trip feed available at ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    eviction.abort();
    pool.close().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
