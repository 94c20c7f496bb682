//! Booking endpoints for guests and tenants.
//!
//! Guests create bookings and upload payment proofs; tenants review the
//! proofs and confirm or reject. Deadline expiry is enforced lazily here
//! and in bulk by the cron endpoints.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::ensure_tenant;
use super::error::{ApiError, ValidationErrorBuilder};
use super::metrics::{record_booking_cancelled, record_booking_confirmed, record_booking_created};
use super::response::ApiResponse;
use super::uploads::{self, PROOF_CONTENT_TYPES};
use super::validation::{
    validate_date, validate_guest_count, validate_room_count, validate_uuid,
};
use crate::db::{
    Booking, BookingListQuery, BookingStatus, BookingWithDetails, CancelReason,
    CreateBookingRequest, CreateBookingResponse, PeakSeasonRate, Property, Room,
    TenantCancelRequest, User,
};
use crate::engine::{availability, lifecycle, pricing, BookingError};
use crate::AppState;

fn validate_create_request(req: &CreateBookingRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_uuid(&req.room_id, "room_id") {
        errors.add("room_id", e);
    }
    if let Err(e) = validate_date(&req.check_in, "check_in") {
        errors.add("check_in", e);
    }
    if let Err(e) = validate_date(&req.check_out, "check_out") {
        errors.add("check_out", e);
    }
    if let Err(e) = validate_room_count(req.room_count) {
        errors.add("room_count", e);
    }
    if let Err(e) = validate_guest_count(req.guest_count) {
        errors.add("guest_count", e);
    }

    errors.finish()
}

async fn booking_by_id(state: &AppState, id: &str) -> Result<Booking, ApiError> {
    if let Err(e) = validate_uuid(id, "booking_id") {
        return Err(ApiError::validation_field("booking_id", e));
    }

    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))
}

/// Flip an expired unpaid booking to cancelled; returns the fresh status
async fn expire_if_past_deadline(
    state: &AppState,
    booking: &Booking,
) -> Result<BookingStatus, ApiError> {
    let status = booking.status_enum();
    if status != BookingStatus::WaitingPayment {
        return Ok(status);
    }

    let expired = booking
        .payment_deadline
        .as_deref()
        .map(|d| lifecycle::is_deadline_passed(d, chrono::Utc::now()))
        .unwrap_or(false);
    if !expired {
        return Ok(status);
    }

    sqlx::query(
        r#"
        UPDATE bookings SET
            status = 'cancelled',
            cancelled_reason = ?,
            updated_at = ?
        WHERE id = ? AND status = 'waiting_payment'
        "#,
    )
    .bind(CancelReason::PaymentTimeout.to_string())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&booking.id)
    .execute(&state.db)
    .await?;

    record_booking_cancelled("payment_timeout");
    tracing::info!(booking = %booking.id, "Booking auto-cancelled on expired deadline");

    Ok(BookingStatus::Cancelled)
}

/// Create a booking for a room
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateBookingResponse>>), ApiError> {
    validate_create_request(&req)?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(&req.room_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&room.property_id)
        .fetch_one(&state.db)
        .await?;

    if property.tenant_id == user.id {
        return Err(ApiError::forbidden("Tenants cannot book their own property"));
    }

    let range = availability::StayRange::parse(&req.check_in, &req.check_out)?;

    if req.guest_count > room.capacity * req.room_count {
        return Err(BookingError::OverCapacity.into());
    }

    let avail = availability::check(&state.db, &room.id, &range, req.room_count).await?;
    if !avail.available {
        return Err(BookingError::RoomUnavailable {
            remaining: avail.remaining,
        }
        .into());
    }

    let rates = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE room_id = ? ORDER BY start_date",
    )
    .bind(&room.id)
    .fetch_all(&state.db)
    .await?;

    let total_price = pricing::booking_total(room.base_price, &range, req.room_count, &rates);

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now();
    let deadline = lifecycle::payment_deadline(now, state.config.booking.payment_deadline_minutes);

    // The gateway transaction must exist before the booking row does
    let mut gateway_order_id = None;
    let mut payment_token = None;
    let mut payment_redirect_url = None;
    if req.use_gateway {
        if !state.payment.is_enabled() {
            return Err(ApiError::service_unavailable(
                "Payment gateway is not configured",
            ));
        }
        let transaction = state
            .payment
            .create_transaction(&id, total_price, &user.name, &user.email)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create gateway transaction");
                ApiError::new(
                    super::error::ErrorCode::ExternalServiceError,
                    "Payment gateway rejected the transaction",
                )
            })?;
        gateway_order_id = Some(id.clone());
        payment_token = Some(transaction.token);
        payment_redirect_url = Some(transaction.redirect_url);
    }

    sqlx::query(
        r#"
        INSERT INTO bookings (id, user_id, room_id, tenant_id, check_in, check_out, room_count,
                              guest_count, total_price, status, payment_deadline,
                              gateway_order_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'waiting_payment', ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&room.id)
    .bind(&property.tenant_id)
    .bind(&req.check_in)
    .bind(&req.check_out)
    .bind(req.room_count)
    .bind(req.guest_count)
    .bind(total_price)
    .bind(&deadline)
    .bind(&gateway_order_id)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&state.db)
    .await?;

    let booking = booking_by_id(&state, &id).await?;

    record_booking_created();
    tracing::info!(
        booking = %booking.id,
        room = %room.name,
        nights = range.nights(),
        total = total_price,
        "Booking created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CreateBookingResponse {
            booking,
            payment_token,
            payment_redirect_url,
        })),
    ))
}

/// List the caller's bookings
pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<ApiResponse<Vec<BookingWithDetails>>>, ApiError> {
    let mut sql = String::from(
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
        WHERE b.user_id = ?
        "#,
    );
    if query.status.is_some() {
        sql.push_str(" AND b.status = ?");
    }
    if query.upcoming {
        sql.push_str(" AND b.check_in >= date('now')");
    }
    sql.push_str(" ORDER BY b.created_at DESC");

    let mut q = sqlx::query_as::<_, BookingWithDetails>(&sql).bind(&user.id);
    if let Some(ref status) = query.status {
        q = q.bind(status);
    }

    let bookings = q.fetch_all(&state.db).await?;

    Ok(Json(ApiResponse::new(bookings)))
}

/// Booking detail, visible to the guest and the tenant it belongs to
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = booking_by_id(&state, &id).await?;

    if booking.user_id != user.id && booking.tenant_id != user.id {
        return Err(ApiError::forbidden("Not your booking"));
    }

    Ok(Json(ApiResponse::new(booking)))
}

/// Guest cancels an unpaid booking
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = booking_by_id(&state, &id).await?;

    if booking.user_id != user.id {
        return Err(ApiError::forbidden("Not your booking"));
    }

    if booking.payment_proof.is_some() {
        return Err(ApiError::conflict(
            "Booking cannot be cancelled after a payment proof was uploaded",
        ));
    }

    lifecycle::ensure_transition(booking.status_enum(), BookingStatus::Cancelled)?;

    sqlx::query(
        r#"
        UPDATE bookings SET
            status = 'cancelled',
            cancelled_reason = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(CancelReason::UserCancelled.to_string())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&booking.id)
    .execute(&state.db)
    .await?;

    record_booking_cancelled("user_cancelled");

    let booking = booking_by_id(&state, &id).await?;
    Ok(Json(ApiResponse::new(booking)))
}

/// Guest uploads a manual-transfer payment proof
pub async fn upload_payment_proof(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = booking_by_id(&state, &id).await?;

    if booking.user_id != user.id {
        return Err(ApiError::forbidden("Not your booking"));
    }

    // Expiry is enforced lazily here: a late upload cancels the booking
    let status = expire_if_past_deadline(&state, &booking).await?;
    if status == BookingStatus::Cancelled && booking.status_enum() == BookingStatus::WaitingPayment
    {
        return Err(BookingError::DeadlinePassed.into());
    }

    lifecycle::ensure_transition(status, BookingStatus::WaitingConfirmation)?;

    let upload = uploads::read_file_field(&mut multipart).await?;
    let path = uploads::save_image(
        &state.config.server.data_dir,
        "proofs",
        &upload,
        PROOF_CONTENT_TYPES,
        state.config.uploads.proof_max_bytes,
    )
    .await?;

    sqlx::query(
        r#"
        UPDATE bookings SET
            status = 'waiting_confirmation',
            payment_proof = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&path)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&booking.id)
    .execute(&state.db)
    .await?;

    tracing::info!(booking = %booking.id, "Payment proof uploaded");

    let booking = booking_by_id(&state, &id).await?;
    Ok(Json(ApiResponse::new(booking)))
}

/// Re-check a gateway transaction and sync the booking with it.
///
/// Covers notifications the webhook missed: a settled transaction
/// confirms the booking, an expired one cancels it.
pub async fn sync_payment_status(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = booking_by_id(&state, &id).await?;

    if booking.user_id != user.id && booking.tenant_id != user.id {
        return Err(ApiError::forbidden("Not your booking"));
    }

    let order_id = booking.gateway_order_id.as_deref().ok_or_else(|| {
        ApiError::conflict("Booking was not paid through the gateway")
    })?;

    let status = state.payment.fetch_status(order_id).await.map_err(|e| {
        tracing::error!(error = %e, booking = %booking.id, "Failed to fetch gateway status");
        ApiError::new(
            super::error::ErrorCode::ExternalServiceError,
            "Payment gateway is unreachable",
        )
    })?;

    let now = chrono::Utc::now().to_rfc3339();
    match status.transaction_status.as_str() {
        "capture" | "settlement"
            if lifecycle::can_transition(booking.status_enum(), BookingStatus::Confirmed) =>
        {
            sqlx::query(
                "UPDATE bookings SET status = 'confirmed', gateway_status = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&status.transaction_status)
            .bind(&now)
            .bind(&booking.id)
            .execute(&state.db)
            .await?;
            record_booking_confirmed();
        }
        "deny" | "cancel" | "expire"
            if lifecycle::can_transition(booking.status_enum(), BookingStatus::Cancelled) =>
        {
            let reason = if status.transaction_status == "expire" {
                CancelReason::PaymentTimeout
            } else {
                CancelReason::PaymentFailed
            };
            sqlx::query(
                r#"
                UPDATE bookings SET
                    status = 'cancelled',
                    cancelled_reason = ?,
                    gateway_status = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(reason.to_string())
            .bind(&status.transaction_status)
            .bind(&now)
            .bind(&booking.id)
            .execute(&state.db)
            .await?;
            record_booking_cancelled(&reason.to_string());
        }
        _ => {
            sqlx::query("UPDATE bookings SET gateway_status = ?, updated_at = ? WHERE id = ?")
                .bind(&status.transaction_status)
                .bind(&now)
                .bind(&booking.id)
                .execute(&state.db)
                .await?;
        }
    }

    let booking = booking_by_id(&state, &id).await?;
    Ok(Json(ApiResponse::new(booking)))
}

/// List bookings for the tenant's properties
pub async fn list_tenant_bookings(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<ApiResponse<Vec<BookingWithDetails>>>, ApiError> {
    ensure_tenant(&user)?;

    let mut sql = String::from(
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
        "#,
    );
    if query.status.is_some() {
        sql.push_str(" AND b.status = ?");
    }
    if query.upcoming {
        sql.push_str(" AND b.check_in >= date('now')");
    }
    sql.push_str(" ORDER BY b.created_at DESC");

    let mut q = sqlx::query_as::<_, BookingWithDetails>(&sql).bind(&user.id);
    if let Some(ref status) = query.status {
        q = q.bind(status);
    }

    let bookings = q.fetch_all(&state.db).await?;

    Ok(Json(ApiResponse::new(bookings)))
}

/// Details needed when emailing the guest about a booking
async fn guest_and_stay(
    state: &AppState,
    booking: &Booking,
) -> Result<(User, Room, Property), ApiError> {
    let guest = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&booking.user_id)
        .fetch_one(&state.db)
        .await?;
    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(&booking.room_id)
        .fetch_one(&state.db)
        .await?;
    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&room.property_id)
        .fetch_one(&state.db)
        .await?;
    Ok((guest, room, property))
}

/// Tenant accepts a payment proof
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    ensure_tenant(&user)?;

    let booking = booking_by_id(&state, &id).await?;
    if booking.tenant_id != user.id {
        return Err(ApiError::forbidden("Booking belongs to another tenant"));
    }

    lifecycle::ensure_transition(booking.status_enum(), BookingStatus::Confirmed)?;

    sqlx::query(
        r#"
        UPDATE bookings SET
            status = 'confirmed',
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&booking.id)
    .execute(&state.db)
    .await?;

    record_booking_confirmed();

    // Confirmation email is best-effort
    let (guest, room, property) = guest_and_stay(&state, &booking).await?;
    if let Err(e) = state
        .mailer
        .send_booking_confirmed_email(
            &guest.email,
            &guest.name,
            &property.name,
            &room.name,
            &booking.check_in,
            &booking.check_out,
            booking.total_price,
        )
        .await
    {
        tracing::warn!(error = %e, booking = %booking.id, "Failed to send confirmation email");
    }

    let booking = booking_by_id(&state, &id).await?;
    Ok(Json(ApiResponse::new(booking)))
}

/// Tenant rejects a payment proof, returning the booking to the guest
pub async fn reject_payment(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    ensure_tenant(&user)?;

    let booking = booking_by_id(&state, &id).await?;
    if booking.tenant_id != user.id {
        return Err(ApiError::forbidden("Booking belongs to another tenant"));
    }

    lifecycle::ensure_transition(booking.status_enum(), BookingStatus::WaitingPayment)?;

    // The guest gets exactly one hour to upload a new proof
    let deadline =
        lifecycle::payment_deadline(chrono::Utc::now(), lifecycle::REJECT_DEADLINE_MINUTES);

    sqlx::query(
        r#"
        UPDATE bookings SET
            status = 'waiting_payment',
            payment_proof = NULL,
            payment_deadline = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&deadline)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&booking.id)
    .execute(&state.db)
    .await?;

    tracing::info!(booking = %booking.id, deadline = %deadline, "Payment proof rejected");

    let (guest, _room, property) = guest_and_stay(&state, &booking).await?;
    if let Err(e) = state
        .mailer
        .send_payment_rejected_email(&guest.email, &guest.name, &property.name, &deadline)
        .await
    {
        tracing::warn!(error = %e, booking = %booking.id, "Failed to send rejection email");
    }

    let booking = booking_by_id(&state, &id).await?;
    Ok(Json(ApiResponse::new(booking)))
}

/// Tenant cancels a not-yet-confirmed booking
pub async fn tenant_cancel_booking(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<TenantCancelRequest>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    ensure_tenant(&user)?;

    let booking = booking_by_id(&state, &id).await?;
    if booking.tenant_id != user.id {
        return Err(ApiError::forbidden("Booking belongs to another tenant"));
    }

    lifecycle::ensure_transition(booking.status_enum(), BookingStatus::Cancelled)?;

    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| CancelReason::TenantCancelled.to_string());

    sqlx::query(
        r#"
        UPDATE bookings SET
            status = 'cancelled',
            cancelled_reason = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&reason)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&booking.id)
    .execute(&state.db)
    .await?;

    record_booking_cancelled("tenant_cancelled");

    let booking = booking_by_id(&state, &id).await?;
    Ok(Json(ApiResponse::new(booking)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;

    async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::default();
        config.server.data_dir = dir.path().to_path_buf();
        let db = crate::db::init(dir.path()).await.unwrap();
        (dir, Arc::new(AppState::new(config, db)))
    }

    const BOOKING_ID: &str = "2d1f7a3e-9c41-4f0a-8a3f-2f51a1d2b9c0";

    /// One tenant, one guest, one room, one booking in the given status
    async fn seed(state: &AppState, status: &str) {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, is_verified, created_at, updated_at)
             VALUES ('guest-1', 'guest@example.com', 'x', 'Guest', 'user', 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z'),
                    ('tenant-1', 'owner@example.com', 'x', 'Owner', 'tenant', 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&state.db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO properties (id, tenant_id, name, address, city, created_at, updated_at)
             VALUES ('prop-1', 'tenant-1', 'Villa', 'Main St 1', 'Denpasar', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&state.db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO rooms (id, property_id, name, base_price, capacity, created_at, updated_at)
             VALUES ('room-1', 'prop-1', 'Deluxe', 50000, 2, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&state.db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO bookings (id, user_id, room_id, tenant_id, check_in, check_out,
                                   room_count, guest_count, total_price, status, payment_proof,
                                   created_at, updated_at)
             VALUES (?, 'guest-1', 'room-1', 'tenant-1', '2026-06-10', '2026-06-12', 1, 2, 100000,
                     ?, 'uploads/proofs/p.png', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(BOOKING_ID)
        .bind(status)
        .execute(&state.db)
        .await
        .unwrap();
    }

    async fn user(state: &AppState, id: &str) -> User {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&state.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reject_payment_resets_with_one_hour_deadline() {
        let (_dir, state) = test_state().await;
        seed(&state, "waiting_confirmation").await;
        let tenant = user(&state, "tenant-1").await;

        let before = chrono::Utc::now();
        let Json(result) = reject_payment(
            State(state.clone()),
            tenant,
            Path(BOOKING_ID.to_string()),
        )
        .await
        .unwrap();
        let after = chrono::Utc::now();

        let booking = result.data;
        assert_eq!(booking.status, "waiting_payment");
        assert!(booking.payment_proof.is_none());

        let deadline = chrono::DateTime::parse_from_rfc3339(
            booking.payment_deadline.as_deref().unwrap(),
        )
        .unwrap()
        .with_timezone(&chrono::Utc);
        assert!(deadline >= before + chrono::Duration::minutes(60));
        assert!(deadline <= after + chrono::Duration::minutes(60));
    }

    #[tokio::test]
    async fn test_reject_payment_requires_waiting_confirmation() {
        let (_dir, state) = test_state().await;
        seed(&state, "confirmed").await;
        let tenant = user(&state, "tenant-1").await;

        let result = reject_payment(
            State(state.clone()),
            tenant,
            Path(BOOKING_ID.to_string()),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_confirm_payment_moves_to_confirmed() {
        let (_dir, state) = test_state().await;
        seed(&state, "waiting_confirmation").await;
        let tenant = user(&state, "tenant-1").await;

        let Json(result) = confirm_payment(
            State(state.clone()),
            tenant,
            Path(BOOKING_ID.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(result.data.status, "confirmed");
    }

    #[tokio::test]
    async fn test_confirm_payment_rejected_for_other_tenant() {
        let (_dir, state) = test_state().await;
        seed(&state, "waiting_confirmation").await;

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, is_verified, created_at, updated_at)
             VALUES ('tenant-2', 'other@example.com', 'x', 'Other', 'tenant', 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&state.db)
        .await
        .unwrap();
        let other = user(&state, "tenant-2").await;

        let result = confirm_payment(
            State(state.clone()),
            other,
            Path(BOOKING_ID.to_string()),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_guest_cancel_blocked_after_proof_upload() {
        let (_dir, state) = test_state().await;
        seed(&state, "waiting_payment").await;
        let guest = user(&state, "guest-1").await;

        // Seeded booking carries a payment proof
        let result = cancel_booking(
            State(state.clone()),
            guest,
            Path(BOOKING_ID.to_string()),
        )
        .await;
        assert!(result.is_err());
    }
}
