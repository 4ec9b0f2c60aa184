//! Event Checkout server.
//!
//! Serves the payment endpoints and runs the orphaned-order sweep until
//! interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use event_checkout::adapters::{
    payment_router, FlowGatewayAdapter, LoggingConfirmationNotifier, PaymentAppState,
    PostgresPaymentOrderStore, PostgresRegistrationLedger, ResendConfirmationNotifier,
};
use event_checkout::application::{LifecyclePorts, PaymentLifecycleService};
use event_checkout::config::{AppConfig, ServerConfig};
use event_checkout::ports::ConfirmationNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.server);
    config.validate().context("validating configuration")?;

    info!(environment = ?config.server.environment, "Starting Event Checkout");

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("connecting to PostgreSQL")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        info!("Database migrations applied");
    }

    let gateway = FlowGatewayAdapter::new(config.gateway.flow_config())
        .context("building payment gateway client")?;

    let notifier: Arc<dyn ConfirmationNotifier> = if config.email.is_enabled() {
        Arc::new(
            ResendConfirmationNotifier::new(&config.email)
                .context("building email notifier")?,
        )
    } else {
        info!("Email disabled, payment confirmations will only be logged");
        Arc::new(LoggingConfirmationNotifier)
    };

    let ports = LifecyclePorts {
        store: Arc::new(PostgresPaymentOrderStore::new(pool.clone())),
        gateway: Arc::new(gateway),
        ledger: Arc::new(PostgresRegistrationLedger::new(pool)),
        notifier,
    };
    let service = Arc::new(PaymentLifecycleService::new(
        ports,
        config.gateway.callback_urls(),
    ));

    let sweep_task = spawn_orphan_sweep(
        service.clone(),
        config.gateway.sweep_interval(),
        config.gateway.orphan_max_age_secs,
    );

    let state = PaymentAppState::new(service, config.gateway.client_base());
    let app = payment_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    sweep_task.abort();
    info!("Event Checkout shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.clone()));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Periodically fail pending orders that never received a gateway token.
fn spawn_orphan_sweep(
    service: Arc<PaymentLifecycleService>,
    every: std::time::Duration,
    max_age_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.sweep_orphans(max_age_secs).await {
                error!(error = %e, "Orphan sweep failed");
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
