pub mod auth;
mod bookings;
mod categories;
mod cron;
mod dashboard;
pub mod error;
pub mod metrics;
mod peak_season_rates;
mod properties;
pub mod response;
mod reviews;
mod rooms;
mod uploads;
mod validation;
mod webhooks;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    // Public catalog routes
    let public_routes = Router::new()
        .route("/properties", get(properties::list_properties))
        .route("/properties/:id", get(properties::get_property))
        .route("/properties/:id/reviews", get(reviews::list_property_reviews))
        .route("/rooms/:id/calendar", get(rooms::room_calendar));

    // Protected routes (session required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/avatar", post(auth::upload_avatar))
        // Guest bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings", get(bookings::list_my_bookings))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/bookings/:id/payment-proof", post(bookings::upload_payment_proof))
        .route("/bookings/:id/payment-status", post(bookings::sync_payment_status))
        // Reviews
        .route("/reviews", post(reviews::create_review))
        .route("/reviews/:id/reply", post(reviews::reply_review))
        // Tenant categories
        .route("/tenant/categories", get(categories::list_categories))
        .route("/tenant/categories", post(categories::create_category))
        .route("/tenant/categories/:id", put(categories::update_category))
        .route("/tenant/categories/:id", delete(categories::delete_category))
        // Tenant properties & rooms
        .route("/tenant/properties", get(properties::list_my_properties))
        .route("/tenant/properties", post(properties::create_property))
        .route("/tenant/properties/:id", put(properties::update_property))
        .route("/tenant/properties/:id", delete(properties::delete_property))
        .route("/tenant/properties/:id/images", post(properties::upload_property_image))
        .route("/tenant/properties/:id/rooms", post(rooms::create_room))
        .route("/tenant/rooms/:id", put(rooms::update_room))
        .route("/tenant/rooms/:id", delete(rooms::delete_room))
        .route("/tenant/rooms/:id/images", post(rooms::upload_room_image))
        // Peak season rates
        .route("/tenant/rooms/:id/peak-season-rates", get(peak_season_rates::list_rates))
        .route("/tenant/rooms/:id/peak-season-rates", post(peak_season_rates::create_rate))
        .route("/tenant/peak-season-rates/:id", put(peak_season_rates::update_rate))
        .route("/tenant/peak-season-rates/:id", delete(peak_season_rates::delete_rate))
        // Tenant bookings & dashboard
        .route("/tenant/bookings", get(bookings::list_tenant_bookings))
        .route("/tenant/bookings/:id/confirm", post(bookings::confirm_payment))
        .route("/tenant/bookings/:id/reject", post(bookings::reject_payment))
        .route("/tenant/bookings/:id/cancel", post(bookings::tenant_cancel_booking))
        .route("/tenant/dashboard", get(dashboard::tenant_dashboard))
        // Protected by auth
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let webhook_routes = Router::new().route("/payment", post(webhooks::payment_webhook));

    // Secret-authenticated maintenance endpoints
    let cron_routes = Router::new()
        .route("/expire-bookings", post(cron::expire_bookings))
        .route("/complete-stays", post(cron::complete_stays))
        .route("/checkin-reminders", post(cron::checkin_reminders));

    // Uploaded files are public, read-only
    let uploads_dir = state.config.server.data_dir.join("uploads");

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api", protected_routes)
        .nest("/webhooks", webhook_routes)
        .nest("/cron", cron_routes)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
