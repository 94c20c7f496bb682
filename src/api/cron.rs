//! Externally-triggered maintenance endpoints.
//!
//! There is no in-process scheduler; an external cron hits these routes.
//! All of them require the shared secret from the config in the
//! `X-Cron-Secret` header.

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::metrics::record_booking_cancelled;
use super::response::ApiResponse;
use crate::db::{Booking, CancelReason};
use crate::engine::lifecycle;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub affected: u64,
}

/// Constant-time check of the X-Cron-Secret header
fn require_cron_secret(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let provided = headers
        .get("X-Cron-Secret")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Cron secret required"))?;

    let expected = state.config.cron.secret.as_bytes();
    let provided = provided.as_bytes();

    // Only compare if lengths match (constant-time check)
    if expected.len() == provided.len() && expected.ct_eq(provided).into() {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Invalid cron secret"))
    }
}

/// Cancel unpaid bookings whose deadline has passed
pub async fn expire_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SweepResult>>, ApiError> {
    require_cron_secret(&state, &headers)?;

    let candidates = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE status = 'waiting_payment' AND payment_deadline IS NOT NULL
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let now = chrono::Utc::now();
    let mut affected = 0u64;

    for booking in candidates {
        let expired = booking
            .payment_deadline
            .as_deref()
            .map(|d| lifecycle::is_deadline_passed(d, now))
            .unwrap_or(false);
        if !expired {
            continue;
        }

        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = 'cancelled',
                cancelled_reason = ?,
                updated_at = ?
            WHERE id = ? AND status = 'waiting_payment'
            "#,
        )
        .bind(CancelReason::PaymentTimeout.to_string())
        .bind(now.to_rfc3339())
        .bind(&booking.id)
        .execute(&state.db)
        .await?;

        if result.rows_affected() > 0 {
            affected += 1;
            record_booking_cancelled("payment_timeout");
            tracing::info!(booking = %booking.id, "Booking expired by cron sweep");
        }
    }

    if affected > 0 {
        tracing::info!(count = affected, "Expired unpaid bookings");
    }

    Ok(Json(ApiResponse::new(SweepResult { affected })))
}

/// Move confirmed stays past their check-out to completed
pub async fn complete_stays(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SweepResult>>, ApiError> {
    require_cron_secret(&state, &headers)?;

    // check_out is a YYYY-MM-DD string, directly comparable to date('now')
    let result = sqlx::query(
        r#"
        UPDATE bookings SET
            status = 'completed',
            updated_at = ?
        WHERE status = 'confirmed' AND check_out <= date('now')
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let affected = result.rows_affected();
    if affected > 0 {
        tracing::info!(count = affected, "Completed finished stays");
    }

    Ok(Json(ApiResponse::new(SweepResult { affected })))
}

/// Email guests whose confirmed stay starts tomorrow
pub async fn checkin_reminders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SweepResult>>, ApiError> {
    require_cron_secret(&state, &headers)?;

    let due: Vec<(String, String, String, String, String)> = sqlx::query_as(
        r#"
        SELECT b.id, u.email, u.name, p.name, b.check_in
        FROM bookings b
        JOIN users u ON b.user_id = u.id
        JOIN rooms r ON b.room_id = r.id
        JOIN properties p ON r.property_id = p.id
        WHERE b.status = 'confirmed'
          AND b.reminder_sent = 0
          AND b.check_in = date('now', '+1 day')
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let mut affected = 0u64;
    for (booking_id, email, guest_name, property_name, check_in) in due {
        if let Err(e) = state
            .mailer
            .send_checkin_reminder_email(&email, &guest_name, &property_name, &check_in)
            .await
        {
            tracing::warn!(error = %e, booking = %booking_id, "Failed to send check-in reminder");
            continue;
        }

        sqlx::query("UPDATE bookings SET reminder_sent = 1, updated_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(&booking_id)
            .execute(&state.db)
            .await?;

        affected += 1;
    }

    if affected > 0 {
        tracing::info!(count = affected, "Sent check-in reminders");
    }

    Ok(Json(ApiResponse::new(SweepResult { affected })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::HeaderValue;

    async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::default();
        config.server.data_dir = dir.path().to_path_buf();
        let db = crate::db::init(dir.path()).await.unwrap();
        (dir, Arc::new(AppState::new(config, db)))
    }

    fn cron_headers(state: &AppState) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Cron-Secret",
            HeaderValue::from_str(&state.config.cron.secret).unwrap(),
        );
        headers
    }

    async fn seed_booking(state: &AppState, id: &str, status: &str, deadline: Option<String>) {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
             VALUES (?, ?, 'x', 'Someone', 'user', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(format!("user-{id}"))
        .bind(format!("{id}@example.com"))
        .execute(&state.db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
             VALUES (?, ?, 'x', 'Owner', 'tenant', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(format!("tenant-{id}"))
        .bind(format!("owner-{id}@example.com"))
        .execute(&state.db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO properties (id, tenant_id, name, address, city, created_at, updated_at)
             VALUES (?, ?, 'Villa', 'Main St 1', 'Denpasar', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(format!("prop-{id}"))
        .bind(format!("tenant-{id}"))
        .execute(&state.db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO rooms (id, property_id, name, base_price, capacity, created_at, updated_at)
             VALUES (?, ?, 'Deluxe', 50000, 2, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(format!("room-{id}"))
        .bind(format!("prop-{id}"))
        .execute(&state.db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO bookings (id, user_id, room_id, tenant_id, check_in, check_out,
                                   room_count, guest_count, total_price, status, payment_deadline,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, '2020-01-10', '2020-01-12', 1, 2, 100000, ?, ?,
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(format!("user-{id}"))
        .bind(format!("room-{id}"))
        .bind(format!("tenant-{id}"))
        .bind(status)
        .bind(deadline)
        .execute(&state.db)
        .await
        .unwrap();
    }

    async fn booking_status(state: &AppState, id: &str) -> (String, Option<String>) {
        sqlx::query_as("SELECT status, cancelled_reason FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cron_rejects_missing_or_wrong_secret() {
        let (_dir, state) = test_state().await;

        let result = expire_bookings(State(state.clone()), HeaderMap::new()).await;
        assert!(result.is_err());

        let mut headers = HeaderMap::new();
        headers.insert("X-Cron-Secret", HeaderValue::from_static("wrong"));
        let result = expire_bookings(State(state), headers).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_expire_bookings_cancels_past_deadline() {
        let (_dir, state) = test_state().await;

        let past = (chrono::Utc::now() - chrono::Duration::minutes(5)).to_rfc3339();
        let future = (chrono::Utc::now() + chrono::Duration::minutes(30)).to_rfc3339();
        seed_booking(&state, "b-late", "waiting_payment", Some(past)).await;
        seed_booking(&state, "b-ok", "waiting_payment", Some(future)).await;

        let headers = cron_headers(&state);
        let Json(result) = expire_bookings(State(state.clone()), headers).await.unwrap();
        assert_eq!(result.data.affected, 1);

        let (status, reason) = booking_status(&state, "b-late").await;
        assert_eq!(status, "cancelled");
        assert_eq!(reason.as_deref(), Some("payment_timeout"));

        let (status, reason) = booking_status(&state, "b-ok").await;
        assert_eq!(status, "waiting_payment");
        assert!(reason.is_none());
    }

    #[tokio::test]
    async fn test_expire_bookings_leaves_other_statuses_alone() {
        let (_dir, state) = test_state().await;

        let past = (chrono::Utc::now() - chrono::Duration::minutes(5)).to_rfc3339();
        seed_booking(&state, "b-conf", "waiting_confirmation", Some(past)).await;

        let headers = cron_headers(&state);
        let Json(result) = expire_bookings(State(state.clone()), headers).await.unwrap();
        assert_eq!(result.data.affected, 0);

        let (status, _) = booking_status(&state, "b-conf").await;
        assert_eq!(status, "waiting_confirmation");
    }

    #[tokio::test]
    async fn test_complete_stays_moves_past_checkouts() {
        let (_dir, state) = test_state().await;

        // check_out of 2020-01-12 is long past
        seed_booking(&state, "b-done", "confirmed", None).await;
        seed_booking(&state, "b-unpaid", "waiting_payment", None).await;

        let headers = cron_headers(&state);
        let Json(result) = complete_stays(State(state.clone()), headers).await.unwrap();
        assert_eq!(result.data.affected, 1);

        let (status, _) = booking_status(&state, "b-done").await;
        assert_eq!(status, "completed");

        let (status, _) = booking_status(&state, "b-unpaid").await;
        assert_eq!(status, "waiting_payment");
    }
}
