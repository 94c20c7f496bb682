//! Prometheus metrics: the `/metrics` endpoint, HTTP middleware, and
//! helpers for recording booking lifecycle events.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const BOOKINGS_TOTAL: &str = "bookings_total";
pub const PAYMENT_WEBHOOKS_TOTAL: &str = "payment_webhooks_total";
pub const PROPERTIES_TOTAL: &str = "properties_total";
pub const BOOKINGS_AWAITING_CONFIRMATION: &str = "bookings_awaiting_confirmation";

/// Install the Prometheus recorder. Called once at startup; the returned
/// handle renders the scrape output.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request duration in seconds");
    describe_counter!(BOOKINGS_TOTAL, "Booking lifecycle events by outcome");
    describe_counter!(PAYMENT_WEBHOOKS_TOTAL, "Payment gateway notifications by result");
    describe_gauge!(PROPERTIES_TOTAL, "Listed properties");
    describe_gauge!(
        BOOKINGS_AWAITING_CONFIRMATION,
        "Bookings waiting for a tenant to review a payment proof"
    );

    handle
}

/// GET /metrics, Prometheus text format. Unauthenticated.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    refresh_gauges(&state).await;

    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Point-in-time gauges are recomputed on every scrape
async fn refresh_gauges(state: &AppState) {
    if let Ok(count) = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM properties")
        .fetch_one(&state.db)
        .await
    {
        gauge!(PROPERTIES_TOTAL).set(count as f64);
    }

    if let Ok(count) = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE status = 'waiting_confirmation'",
    )
    .fetch_one(&state.db)
    .await
    {
        gauge!(BOOKINGS_AWAITING_CONFIRMATION).set(count as f64);
    }
}

/// Track request counts and latency per method/route/status. Uses the
/// matched route template (`/bookings/:id`) so label cardinality stays
/// bounded.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();

    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status)
        .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path)
        .record(started.elapsed().as_secs_f64());

    response
}

pub fn record_booking_created() {
    counter!(BOOKINGS_TOTAL, "outcome" => "created").increment(1);
}

pub fn record_booking_confirmed() {
    counter!(BOOKINGS_TOTAL, "outcome" => "confirmed").increment(1);
}

pub fn record_booking_cancelled(reason: &str) {
    counter!(BOOKINGS_TOTAL, "outcome" => "cancelled", "reason" => reason.to_string()).increment(1);
}

pub fn record_payment_webhook(result: &str) {
    counter!(PAYMENT_WEBHOOKS_TOTAL, "result" => result.to_string()).increment(1);
}
