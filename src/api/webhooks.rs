//! Payment gateway webhook.
//!
//! The gateway signs every notification with HMAC-SHA512 over the raw
//! request body, keyed with our server key, and sends the hex digest in
//! the `X-Callback-Signature` header.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;
use std::sync::Arc;

use super::metrics::{record_booking_cancelled, record_booking_confirmed, record_payment_webhook};
use crate::db::{Booking, BookingStatus, CancelReason};
use crate::engine::lifecycle;
use crate::AppState;

type HmacSha512 = Hmac<Sha512>;

/// Verify the gateway signature (X-Callback-Signature header)
fn verify_signature(server_key: &str, signature_header: &str, payload: &[u8]) -> bool {
    let expected = match hex::decode(signature_header) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha512::new_from_slice(server_key.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);

    // Use constant-time comparison
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    pub transaction_status: String,
    #[allow(dead_code)]
    pub gross_amount: Option<i64>,
}

pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let server_key = state
        .config
        .payment
        .server_key
        .as_deref()
        .ok_or_else(|| {
            tracing::warn!("Payment webhook received but gateway is not configured");
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    let signature = headers
        .get("X-Callback-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Payment webhook missing X-Callback-Signature header");
            StatusCode::UNAUTHORIZED
        })?;

    if !verify_signature(server_key, signature, &body) {
        tracing::warn!("Payment webhook signature verification failed");
        record_payment_webhook("bad_signature");
        return Err(StatusCode::UNAUTHORIZED);
    }
    tracing::debug!("Payment webhook signature verified");

    // Parse the JSON payload
    let payload: PaymentNotification = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse payment webhook payload: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let booking: Option<Booking> = sqlx::query_as(
        "SELECT * FROM bookings WHERE gateway_order_id = ?",
    )
    .bind(&payload.order_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Unknown orders are acknowledged so the gateway stops retrying
    let Some(booking) = booking else {
        tracing::warn!(order_id = %payload.order_id, "No booking for payment notification");
        record_payment_webhook("unknown_order");
        return Ok(StatusCode::OK);
    };

    tracing::info!(
        booking = %booking.id,
        status = %payload.transaction_status,
        "Payment notification received"
    );

    let now = chrono::Utc::now().to_rfc3339();

    match payload.transaction_status.as_str() {
        "capture" | "settlement" => {
            if lifecycle::can_transition(booking.status_enum(), BookingStatus::Confirmed) {
                sqlx::query(
                    r#"
                    UPDATE bookings SET
                        status = 'confirmed',
                        gateway_status = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&payload.transaction_status)
                .bind(&now)
                .bind(&booking.id)
                .execute(&state.db)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

                record_booking_confirmed();
                send_confirmation_email(&state, &booking).await;
            } else {
                tracing::warn!(
                    booking = %booking.id,
                    status = %booking.status,
                    "Ignoring settlement for booking not awaiting payment"
                );
            }
        }
        "pending" => {
            sqlx::query(
                "UPDATE bookings SET gateway_status = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&payload.transaction_status)
            .bind(&now)
            .bind(&booking.id)
            .execute(&state.db)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }
        "deny" | "cancel" | "expire" => {
            if lifecycle::can_transition(booking.status_enum(), BookingStatus::Cancelled) {
                let reason = if payload.transaction_status == "expire" {
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
                .bind(&payload.transaction_status)
                .bind(&now)
                .bind(&booking.id)
                .execute(&state.db)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

                record_booking_cancelled(&reason.to_string());
            }
        }
        other => {
            tracing::warn!(status = %other, "Unhandled payment transaction status");
        }
    }

    record_payment_webhook("processed");
    Ok(StatusCode::OK)
}

/// Confirmation email is best-effort; failures are logged only
async fn send_confirmation_email(state: &AppState, booking: &Booking) {
    let details = async {
        let guest: crate::db::User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&booking.user_id)
            .fetch_one(&state.db)
            .await?;
        let room: crate::db::Room = sqlx::query_as("SELECT * FROM rooms WHERE id = ?")
            .bind(&booking.room_id)
            .fetch_one(&state.db)
            .await?;
        let property: crate::db::Property =
            sqlx::query_as("SELECT * FROM properties WHERE id = ?")
                .bind(&room.property_id)
                .fetch_one(&state.db)
                .await?;
        Ok::<_, sqlx::Error>((guest, room, property))
    }
    .await;

    let (guest, room, property) = match details {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, booking = %booking.id, "Failed to load booking details for email");
            return;
        }
    };

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
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::HeaderValue;

    fn sign(key: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(key.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    const SERVER_KEY: &str = "test-server-key";

    async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::default();
        config.server.data_dir = dir.path().to_path_buf();
        config.payment.server_key = Some(SERVER_KEY.to_string());
        let db = crate::db::init(dir.path()).await.unwrap();
        (dir, Arc::new(AppState::new(config, db)))
    }

    /// One gateway-paid booking in waiting_payment
    async fn seed_gateway_booking(state: &AppState, id: &str) {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
             VALUES ('guest-1', 'guest@example.com', 'x', 'Guest', 'user', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z'),
                    ('tenant-1', 'owner@example.com', 'x', 'Owner', 'tenant', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
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
                                   room_count, guest_count, total_price, status, gateway_order_id,
                                   created_at, updated_at)
             VALUES (?, 'guest-1', 'room-1', 'tenant-1', '2026-06-10', '2026-06-12', 1, 2, 100000,
                     'waiting_payment', ?, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(id)
        .execute(&state.db)
        .await
        .unwrap();
    }

    fn signed_headers(payload: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Callback-Signature",
            HeaderValue::from_str(&sign(SERVER_KEY, payload)).unwrap(),
        );
        headers
    }

    async fn booking_state(state: &AppState, id: &str) -> (String, Option<String>, Option<String>) {
        sqlx::query_as(
            "SELECT status, cancelled_reason, gateway_status FROM bookings WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&state.db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_webhook_settlement_confirms_booking() {
        let (_dir, state) = test_state().await;
        seed_gateway_booking(&state, "order-1").await;

        let payload = br#"{"order_id":"order-1","transaction_status":"settlement"}"#;
        let status = payment_webhook(
            State(state.clone()),
            signed_headers(payload),
            Bytes::from_static(payload),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);

        let (status, reason, gateway) = booking_state(&state, "order-1").await;
        assert_eq!(status, "confirmed");
        assert!(reason.is_none());
        assert_eq!(gateway.as_deref(), Some("settlement"));
    }

    #[tokio::test]
    async fn test_webhook_expire_cancels_with_timeout_reason() {
        let (_dir, state) = test_state().await;
        seed_gateway_booking(&state, "order-1").await;

        let payload = br#"{"order_id":"order-1","transaction_status":"expire"}"#;
        payment_webhook(
            State(state.clone()),
            signed_headers(payload),
            Bytes::from_static(payload),
        )
        .await
        .unwrap();

        let (status, reason, _) = booking_state(&state, "order-1").await;
        assert_eq!(status, "cancelled");
        assert_eq!(reason.as_deref(), Some("payment_timeout"));
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let (_dir, state) = test_state().await;
        seed_gateway_booking(&state, "order-1").await;

        let payload = br#"{"order_id":"order-1","transaction_status":"settlement"}"#;
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Callback-Signature",
            HeaderValue::from_str(&sign("wrong-key", payload)).unwrap(),
        );

        let result = payment_webhook(State(state.clone()), headers, Bytes::from_static(payload)).await;
        assert_eq!(result, Err(StatusCode::UNAUTHORIZED));

        let (status, _, _) = booking_state(&state, "order-1").await;
        assert_eq!(status, "waiting_payment");
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_unknown_order() {
        let (_dir, state) = test_state().await;

        let payload = br#"{"order_id":"no-such-order","transaction_status":"settlement"}"#;
        let status = payment_webhook(
            State(state),
            signed_headers(payload),
            Bytes::from_static(payload),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let payload = br#"{"order_id":"b-1","transaction_status":"settlement"}"#;
        let signature = sign("server-key", payload);
        assert!(verify_signature("server-key", &signature, payload));
    }

    #[test]
    fn test_verify_signature_rejects_wrong_key() {
        let payload = br#"{"order_id":"b-1","transaction_status":"settlement"}"#;
        let signature = sign("other-key", payload);
        assert!(!verify_signature("server-key", &signature, payload));
    }

    #[test]
    fn test_verify_signature_rejects_tampered_body() {
        let payload = br#"{"order_id":"b-1","transaction_status":"settlement"}"#;
        let signature = sign("server-key", payload);
        let tampered = br#"{"order_id":"b-2","transaction_status":"settlement"}"#;
        assert!(!verify_signature("server-key", &signature, tampered));
    }

    #[test]
    fn test_verify_signature_rejects_non_hex() {
        assert!(!verify_signature("server-key", "zz-not-hex", b"{}"));
    }
}
