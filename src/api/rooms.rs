//! Room endpoints: tenant management plus the public price calendar.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::ensure_tenant;
use super::error::{ApiError, ValidationErrorBuilder};
use super::response::ApiResponse;
use super::uploads::{self, IMAGE_CONTENT_TYPES};
use super::validation::{
    validate_capacity, validate_description, validate_month, validate_name, validate_price,
    validate_uuid,
};
use crate::db::{
    parse_images, serialize_images, CalendarDay, CalendarQuery, CreateRoomRequest, PeakSeasonRate,
    Property, Room, RoomResponse, UpdateRoomRequest, User,
};
use crate::engine::{availability, pricing, ROOM_UNIT_CAP};
use crate::AppState;

fn validate_create_request(req: &CreateRoomRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name, "Room name") {
        errors.add("name", e);
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_price(req.base_price) {
        errors.add("base_price", e);
    }
    if let Err(e) = validate_capacity(req.capacity) {
        errors.add("capacity", e);
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateRoomRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(ref name) = req.name {
        if let Err(e) = validate_name(name, "Room name") {
            errors.add("name", e);
        }
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    if let Some(base_price) = req.base_price {
        if let Err(e) = validate_price(base_price) {
            errors.add("base_price", e);
        }
    }
    if let Some(capacity) = req.capacity {
        if let Err(e) = validate_capacity(capacity) {
            errors.add("capacity", e);
        }
    }

    errors.finish()
}

/// Fetch a property and check the caller owns it
async fn owned_property(state: &AppState, user: &User, id: &str) -> Result<Property, ApiError> {
    if let Err(e) = validate_uuid(id, "property_id") {
        return Err(ApiError::validation_field("property_id", e));
    }

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;

    if property.tenant_id != user.id {
        return Err(ApiError::forbidden("Property belongs to another tenant"));
    }

    Ok(property)
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

/// Create a room under a property
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(property_id): Path<String>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoomResponse>>), ApiError> {
    ensure_tenant(&user)?;
    validate_create_request(&req)?;

    let property = owned_property(&state, &user, &property_id).await?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO rooms (id, property_id, name, description, base_price, capacity,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&property.id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(req.base_price)
    .bind(req.capacity)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(RoomResponse::from(room))),
    ))
}

/// Update a room
pub async fn update_room(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoomRequest>,
) -> Result<Json<ApiResponse<RoomResponse>>, ApiError> {
    ensure_tenant(&user)?;
    validate_update_request(&req)?;

    let room = owned_room(&state, &user, &id).await?;
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE rooms SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            base_price = COALESCE(?, base_price),
            capacity = COALESCE(?, capacity),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(req.base_price)
    .bind(req.capacity)
    .bind(&now)
    .bind(&room.id)
    .execute(&state.db)
    .await?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(&room.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(RoomResponse::from(room))))
}

/// Delete a room and its stored images
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ensure_tenant(&user)?;

    let room = owned_room(&state, &user, &id).await?;

    let active: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM bookings
        WHERE room_id = ?
          AND status IN ('waiting_payment', 'waiting_confirmation', 'confirmed')
        "#,
    )
    .bind(&room.id)
    .fetch_one(&state.db)
    .await?;
    if active.0 > 0 {
        return Err(ApiError::conflict(
            "Room still has active bookings and cannot be deleted",
        ));
    }

    sqlx::query("DELETE FROM rooms WHERE id = ?")
        .bind(&room.id)
        .execute(&state.db)
        .await?;

    for image in parse_images(room.images.as_deref()) {
        uploads::remove_upload(&state.config.server.data_dir, &image).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Attach an uploaded photo to a room
pub async fn upload_room_image(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<RoomResponse>>, ApiError> {
    ensure_tenant(&user)?;

    let room = owned_room(&state, &user, &id).await?;

    let upload = uploads::read_file_field(&mut multipart).await?;
    let path = uploads::save_image(
        &state.config.server.data_dir,
        "rooms",
        &upload,
        IMAGE_CONTENT_TYPES,
        state.config.uploads.image_max_bytes,
    )
    .await?;

    let mut images = parse_images(room.images.as_deref());
    images.push(path);

    sqlx::query("UPDATE rooms SET images = ?, updated_at = ? WHERE id = ?")
        .bind(serialize_images(&images))
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&room.id)
        .execute(&state.db)
        .await?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(&room.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(RoomResponse::from(room))))
}

/// Public day-by-day price and availability calendar for one month.
///
/// Prices here are per-night estimates: peak rates apply first, then the
/// weekend uplift. Booking totals are computed separately at creation.
pub async fn room_calendar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<ApiResponse<Vec<CalendarDay>>>, ApiError> {
    if let Err(e) = validate_uuid(&id, "room_id") {
        return Err(ApiError::validation_field("room_id", e));
    }
    if let Err(e) = validate_month(&query.month) {
        return Err(ApiError::validation_field("month", e));
    }

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let rates = sqlx::query_as::<_, PeakSeasonRate>(
        "SELECT * FROM peak_season_rates WHERE room_id = ? ORDER BY start_date",
    )
    .bind(&room.id)
    .fetch_all(&state.db)
    .await?;

    let mut days = Vec::new();
    for day in pricing::month_days(&query.month)? {
        let (price, peak_season) = pricing::day_price(room.base_price, day, &rates);
        let reserved = availability::reserved_units_for_day(&state.db, &room.id, day).await?;
        let remaining = (ROOM_UNIT_CAP - reserved).max(0);

        days.push(CalendarDay {
            date: day.format("%Y-%m-%d").to_string(),
            price,
            peak_season,
            remaining_units: remaining,
            available: remaining > 0,
        });
    }

    Ok(Json(ApiResponse::new(days)))
}
