//! Tenant dashboard aggregates.

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::ensure_tenant;
use super::error::ApiError;
use super::response::ApiResponse;
use crate::db::{BookingWithDetails, User};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TenantDashboard {
    pub property_count: i64,
    pub room_count: i64,
    /// Booking counts keyed by status
    pub bookings_by_status: HashMap<String, i64>,
    /// Sum of totals for confirmed and completed bookings
    pub revenue: i64,
    pub recent_bookings: Vec<BookingWithDetails>,
}

/// Aggregated view over the tenant's listings and bookings
pub async fn tenant_dashboard(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<ApiResponse<TenantDashboard>>, ApiError> {
    ensure_tenant(&user)?;

    let property_count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM properties WHERE tenant_id = ?",
    )
    .bind(&user.id)
    .fetch_one(&state.db)
    .await?;

    let room_count: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM rooms r
        JOIN properties p ON r.property_id = p.id
        WHERE p.tenant_id = ?
        "#,
    )
    .bind(&user.id)
    .fetch_one(&state.db)
    .await?;

    let status_rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM bookings WHERE tenant_id = ? GROUP BY status",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;
    let bookings_by_status = status_rows.into_iter().collect();

    let revenue: (Option<i64>,) = sqlx::query_as(
        r#"
        SELECT SUM(total_price) FROM bookings
        WHERE tenant_id = ? AND status IN ('confirmed', 'completed')
        "#,
    )
    .bind(&user.id)
    .fetch_one(&state.db)
    .await?;

    let recent_bookings = sqlx::query_as::<_, BookingWithDetails>(
        r#"
        SELECT b.id, b.user_id, b.room_id, b.tenant_id, b.check_in, b.check_out, b.room_count,
               b.guest_count, b.total_price, b.status, b.payment_proof, b.payment_deadline,
               b.cancelled_reason, b.created_at,
               r.name AS room_name, p.id AS property_id, p.name AS property_name,
               u.name AS guest_name
        FROM bookings b
        JOIN rooms r ON b.room_id = r.id
        JOIN properties p ON r.property_id = p.id
        JOIN users u ON b.user_id = u.id
        WHERE b.tenant_id = ?
        ORDER BY b.created_at DESC
        LIMIT 10
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::new(TenantDashboard {
        property_count: property_count.0,
        room_count: room_count.0,
        bookings_by_status,
        revenue: revenue.0.unwrap_or(0),
        recent_bookings,
    })))
}
