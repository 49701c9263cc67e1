//! LinkUp Payments API
//!
//! HTTP surface of the payments backend.
//!
//! ## REST Endpoints
//!
//! - `POST /api/v1/bookings/intent` - Create a booking payment intent
//! - `GET /api/v1/bookings/me` - Caller's confirmed bookings
//! - `POST /api/v1/sponsorships/intent` - Create a sponsorship payment intent
//! - `GET /api/v1/sponsorships/events` - Active sponsored events
//! - `GET /api/v1/sponsorships/events/random` - Random sample of sponsored events
//! - `GET|POST /api/v1/sponsorships/packages` - List or create packages
//! - `PATCH /api/v1/sponsorships/packages/{id}` - Update a package
//! - `GET /api/v1/payments/transactions` - Caller's paid transactions
//! - `GET /api/v1/payments/transactions/all` - Every transaction (admin)
//! - `GET /api/v1/trending` - Trending upcoming events
//! - `POST /api/v1/trending/{event_id}/views` - Record an event view
//! - `GET /api/v1/dashboard/stats` - Platform totals (admin)
//! - `GET /api/v1/dashboard/revenue` - Twelve-month revenue (admin)
//! - `GET /api/v1/dashboard/analytics/{product}` - Weekly analytics (admin)
//! - `POST /webhooks/stripe/booking` - Booking webhook
//! - `POST /webhooks/stripe/sponsored` - Sponsorship webhook
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use crate::config::{Config, ConfigError};
pub use crate::state::AppState;

/// Build the HTTP router with the full middleware stack
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let api_v1 = Router::new()
        // Bookings
        .route("/bookings/intent", post(handlers::create_booking_intent))
        .route("/bookings/me", get(handlers::my_bookings))
        // Sponsorships
        .route(
            "/sponsorships/intent",
            post(handlers::create_sponsorship_intent),
        )
        .route("/sponsorships/events", get(handlers::sponsored_events))
        .route(
            "/sponsorships/events/random",
            get(handlers::random_sponsored_events),
        )
        .route(
            "/sponsorships/packages",
            get(handlers::list_packages).post(handlers::create_package),
        )
        .route(
            "/sponsorships/packages/{id}",
            patch(handlers::update_package),
        )
        // Transactions
        .route("/payments/transactions", get(handlers::my_transactions))
        .route(
            "/payments/transactions/all",
            get(handlers::all_transactions),
        )
        // Trending
        .route("/trending", get(handlers::list_trending))
        .route("/trending/{event_id}/views", post(handlers::record_view))
        // Dashboard
        .route("/dashboard/stats", get(handlers::stats))
        .route("/dashboard/revenue", get(handlers::monthly_revenue))
        .route(
            "/dashboard/analytics/{product}",
            get(handlers::weekly_analytics),
        );

    // Webhook routes (raw body, verified before parsing)
    let webhook_routes = Router::new()
        .route("/webhooks/stripe/booking", post(handlers::booking_webhook))
        .route(
            "/webhooks/stripe/sponsored",
            post(handlers::sponsored_webhook),
        );

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready));

    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
