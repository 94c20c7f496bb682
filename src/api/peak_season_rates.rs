//! Peak season rate endpoints.
//!
//! Rates are tenant-managed, scoped to a room, and must never overlap
//! another rate on the same room.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::ensure_tenant;
use super::error::{ApiError, ValidationErrorBuilder};
use super::response::ApiResponse;
use super::validation::{validate_adjustment, validate_date, validate_uuid};
use crate::db::{
    CreatePeakSeasonRateRequest, PeakSeasonRate, Property, Room, UpdatePeakSeasonRateRequest, User,
};
use crate::engine::{pricing, BookingError};
use crate::AppState;

fn validate_create_request(req: &CreatePeakSeasonRateRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_date(&req.start_date, "start_date") {
        errors.add("start_date", e);
    }
    if let Err(e) = validate_date(&req.end_date, "end_date") {
        errors.add("end_date", e);
    }
    if let Err(e) = validate_adjustment(&req.adjustment_type, req.value) {
        errors.add("adjustment_type", e);
    }

    errors.finish()?;

    if req.end_date < req.start_date {
        return Err(ApiError::validation_field(
            "end_date",
            "End date must not be before start date",
        ));
    }

    Ok(())
}

/// Fetch a room and check the caller owns its property
async fn owned_room(state: &AppState, user: &User, id: &str) -> Result<Room, ApiError> {
    if let Err(e) = validate_uuid(id, "room_id") {
        return Err(ApiError::validation_field("room_id", e));
    }

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&room.property_id)
        .fetch_one(&state.db)
        .await?;

    if property.tenant_id != user.id {
        return Err(ApiError::forbidden("Room belongs to another tenant"));
    }

    Ok(room)
}

/// Reject a range that overlaps another rate on the room
async fn ensure_no_overlap(
    state: &AppState,
    room_id: &str,
    start_date: &str,
    end_date: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let existing = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE room_id = ? ORDER BY start_date",
    )
    .bind(room_id)
    .fetch_all(&state.db)
    .await?;

    for rate in existing {
        if exclude_id == Some(rate.id.as_str()) {
            continue;
        }
        if pricing::rate_ranges_overlap(start_date, end_date, &rate.start_date, &rate.end_date) {
            return Err(BookingError::OverlappingRate.into());
        }
    }

    Ok(())
}

/// List the rates configured for a room
pub async fn list_rates(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PeakSeasonRate>>>, ApiError> {
    ensure_tenant(&user)?;

    let room = owned_room(&state, &user, &room_id).await?;

    let rates = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE room_id = ? ORDER BY start_date",
    )
    .bind(&room.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::new(rates)))
}

/// Create a rate for a room
pub async fn create_rate(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(room_id): Path<String>,
    Json(req): Json<CreatePeakSeasonRateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PeakSeasonRate>>), ApiError> {
    ensure_tenant(&user)?;
    validate_create_request(&req)?;

    let room = owned_room(&state, &user, &room_id).await?;
    ensure_no_overlap(&state, &room.id, &req.start_date, &req.end_date, None).await?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO peak_season_rates (id, room_id, start_date, end_date, adjustment_type, value,
                                       created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&room.id)
    .bind(&req.start_date)
    .bind(&req.end_date)
    .bind(&req.adjustment_type)
    .bind(req.value)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let rate = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(rate))))
}

/// Update a rate, revalidating range overlap
pub async fn update_rate(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdatePeakSeasonRateRequest>,
) -> Result<Json<ApiResponse<PeakSeasonRate>>, ApiError> {
    ensure_tenant(&user)?;

    if let Err(e) = validate_uuid(&id, "rate_id") {
        return Err(ApiError::validation_field("rate_id", e));
    }

    let rate = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE id = ?",
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Peak season rate not found"))?;

    let _room = owned_room(&state, &user, &rate.room_id).await?;

    // Merge the patch with stored values before validating
    let start_date = req.start_date.clone().unwrap_or_else(|| rate.start_date.clone());
    let end_date = req.end_date.clone().unwrap_or_else(|| rate.end_date.clone());
    let adjustment_type = req
        .adjustment_type
        .clone()
        .unwrap_or_else(|| rate.adjustment_type.clone());
    let value = req.value.unwrap_or(rate.value);

    if let Err(e) = validate_date(&start_date, "start_date") {
        return Err(ApiError::validation_field("start_date", e));
    }
    if let Err(e) = validate_date(&end_date, "end_date") {
        return Err(ApiError::validation_field("end_date", e));
    }
    if end_date < start_date {
        return Err(ApiError::validation_field(
            "end_date",
            "End date must not be before start date",
        ));
    }
    if let Err(e) = validate_adjustment(&adjustment_type, value) {
        return Err(ApiError::validation_field("adjustment_type", e));
    }

    ensure_no_overlap(&state, &rate.room_id, &start_date, &end_date, Some(&rate.id)).await?;

    sqlx::query(
        r#"
        UPDATE peak_season_rates SET
            start_date = ?,
            end_date = ?,
            adjustment_type = ?,
            value = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&start_date)
    .bind(&end_date)
    .bind(&adjustment_type)
    .bind(value)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&rate.id)
    .execute(&state.db)
    .await?;

    let rate = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE id = ?",
    )
    .bind(&rate.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ApiResponse::new(rate)))
}

/// Delete a rate
pub async fn delete_rate(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ensure_tenant(&user)?;

    if let Err(e) = validate_uuid(&id, "rate_id") {
        return Err(ApiError::validation_field("rate_id", e));
    }

    let rate = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE id = ?",
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Peak season rate not found"))?;

    let _room = owned_room(&state, &user, &rate.room_id).await?;

    sqlx::query("DELETE FROM peak_season_rates WHERE id = ?")
        .bind(&rate.id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;

    const ROOM_ID: &str = "7b8a2c94-51d6-4e0b-9f1d-6a0c3b2e8d41";

    async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::default();
        config.server.data_dir = dir.path().to_path_buf();
        let db = crate::db::init(dir.path()).await.unwrap();
        (dir, Arc::new(AppState::new(config, db)))
    }

    async fn seed_room(state: &AppState) -> User {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, is_verified, created_at, updated_at)
             VALUES ('tenant-1', 'owner@example.com', 'x', 'Owner', 'tenant', 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
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
             VALUES (?, 'prop-1', 'Deluxe', 50000, 2, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(ROOM_ID)
        .execute(&state.db)
        .await
        .unwrap();

        sqlx::query_as("SELECT * FROM users WHERE id = 'tenant-1'")
            .fetch_one(&state.db)
            .await
            .unwrap()
    }

    fn rate_request(start: &str, end: &str) -> CreatePeakSeasonRateRequest {
        CreatePeakSeasonRateRequest {
            start_date: start.to_string(),
            end_date: end.to_string(),
            adjustment_type: "percentage".to_string(),
            value: 25,
        }
    }

    #[tokio::test]
    async fn test_create_rate_rejects_overlapping_range() {
        let (_dir, state) = test_state().await;
        let tenant = seed_room(&state).await;

        let result = create_rate(
            State(state.clone()),
            tenant.clone(),
            Path(ROOM_ID.to_string()),
            Json(rate_request("2026-12-20", "2026-12-31")),
        )
        .await;
        assert!(result.is_ok());

        // Touches the existing range on its last day
        let result = create_rate(
            State(state.clone()),
            tenant.clone(),
            Path(ROOM_ID.to_string()),
            Json(rate_request("2026-12-31", "2027-01-05")),
        )
        .await;
        assert!(result.is_err());

        // Disjoint range is fine
        let result = create_rate(
            State(state.clone()),
            tenant,
            Path(ROOM_ID.to_string()),
            Json(rate_request("2027-01-01", "2027-01-05")),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_rate_rejects_inverted_range() {
        let (_dir, state) = test_state().await;
        let tenant = seed_room(&state).await;

        let result = create_rate(
            State(state.clone()),
            tenant,
            Path(ROOM_ID.to_string()),
            Json(rate_request("2026-12-31", "2026-12-20")),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_rate_may_keep_its_own_range() {
        let (_dir, state) = test_state().await;
        let tenant = seed_room(&state).await;

        let (_, Json(created)) = create_rate(
            State(state.clone()),
            tenant.clone(),
            Path(ROOM_ID.to_string()),
            Json(rate_request("2026-12-20", "2026-12-31")),
        )
        .await
        .unwrap();

        // Changing only the value keeps the same range; the rate must not
        // collide with itself
        let result = update_rate(
            State(state.clone()),
            tenant,
            Path(created.data.id.clone()),
            Json(UpdatePeakSeasonRateRequest {
                start_date: None,
                end_date: None,
                adjustment_type: None,
                value: Some(40),
            }),
        )
        .await;
        assert!(result.is_ok());
        let Json(updated) = result.unwrap();
        assert_eq!(updated.data.value, 40);
    }
}
