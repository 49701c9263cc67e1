//! LinkUp Payments API server
//!
//! See the library crate for the route table.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use linkup_db::Repositories;
use linkup_payments_core::{
    ExpirySweep, HttpNotifier, Ledger, LogNotifier, Notifier, SideEffectDispatcher,
    SideEffectWorker, StripeProvider,
};
use payments_api::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("payments_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LinkUp Payments API");

    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        currency = %config.payments.currency,
        expiry_sweep = config.expiry_sweep_enabled,
        "Configuration loaded"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let pool = linkup_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");
    if config.run_migrations {
        linkup_db::run_migrations(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let ledger = Ledger::from(Repositories::new(pool.clone()));

    let notifier: Arc<dyn Notifier> = match &config.notification_service_url {
        Some(url) => Arc::new(HttpNotifier::new(url.clone())),
        None => {
            tracing::warn!("NOTIFICATION_SERVICE_URL not set, side effects will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let worker = SideEffectWorker::new(
        ledger.clone(),
        notifier,
        config.payments.retry.clone(),
        config.payments.support_email.clone(),
    );
    let (dispatcher, dispatcher_handle) =
        SideEffectDispatcher::spawn(worker, config.side_effect_queue_size);

    let sweep = config
        .expiry_sweep_enabled
        .then(|| ExpirySweep::new(ledger.clone()).spawn());

    let provider = Arc::new(StripeProvider::new(&config.payments));
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(ledger, provider, dispatcher, Some(pool), config);

    let app = build_router(state, metrics_handle);
    if let Err(e) = run_http_server(app, http_addr).await {
        tracing::error!(error = ?e, "HTTP server error");
    }

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    // Router and state are gone, so the queue sender is closed; drain it
    dispatcher_handle.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let service: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
        app.into_make_service_with_connect_info();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Provider round trips dominate; allow for multi-second tails
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("payments_operation_duration_seconds".to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "payments_intents_created_total",
        "Payment intents created by product"
    );
    metrics::describe_counter!(
        "payments_webhooks_processed_total",
        "Webhook deliveries by endpoint and status"
    );
    metrics::describe_counter!(
        "payments_reconciliations_total",
        "Reconciled outcomes by product and whether the ledger changed"
    );
    metrics::describe_counter!(
        "payments_side_effects_total",
        "Side-effect deliveries by channel and status"
    );
    metrics::describe_counter!(
        "payments_sponsorships_expired_total",
        "Boost sponsorships expired by the daily sweep"
    );
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP handler latency in seconds by operation"
    );
    metrics::describe_histogram!(
        "payments_operation_duration_seconds",
        "Payments operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = ?e, "failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
