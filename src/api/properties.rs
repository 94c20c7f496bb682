//! Property endpoints: public search/detail plus tenant management.

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
    validate_description, validate_geolocation, validate_name, validate_uuid,
};
use crate::db::{
    parse_images, serialize_images, Category, CreatePropertyRequest, Property, PropertyListQuery,
    PropertyResponse, PropertySummary, PropertyWithRooms, Room, RoomResponse,
    UpdatePropertyRequest, User,
};
use crate::AppState;

fn validate_create_request(req: &CreatePropertyRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name, "Property name") {
        errors.add("name", e);
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    if req.address.trim().is_empty() {
        errors.add("address", "Address is required");
    }
    if req.city.trim().is_empty() {
        errors.add("city", "City is required");
    }
    if let Err(e) = validate_geolocation(&req.latitude, &req.longitude) {
        errors.add("latitude", e);
    }
    if let Some(ref category_id) = req.category_id {
        if let Err(e) = validate_uuid(category_id, "category_id") {
            errors.add("category_id", e);
        }
    }

    errors.finish()
}

fn validate_update_request(req: &UpdatePropertyRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(ref name) = req.name {
        if let Err(e) = validate_name(name, "Property name") {
            errors.add("name", e);
        }
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_geolocation(&req.latitude, &req.longitude) {
        errors.add("latitude", e);
    }

    errors.finish()
}

/// Resolve a category name, tolerating unassigned properties
async fn category_name(
    state: &AppState,
    category_id: Option<&str>,
) -> Result<Option<String>, ApiError> {
    let Some(category_id) = category_id else {
        return Ok(None);
    };
    let name: Option<(String,)> = sqlx::query_as("SELECT name FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(&state.db)
        .await?;
    Ok(name.map(|(n,)| n))
}

/// Public property listing with optional filters
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PropertyListQuery>,
) -> Result<Json<ApiResponse<Vec<PropertySummary>>>, ApiError> {
    let mut sql = String::from("SELECT * FROM properties WHERE 1=1");
    if query.city.is_some() {
        sql.push_str(" AND LOWER(city) = LOWER(?)");
    }
    if query.category_id.is_some() {
        sql.push_str(" AND category_id = ?");
    }
    if query.search.is_some() {
        sql.push_str(" AND LOWER(name) LIKE LOWER(?)");
    }
    sql.push_str(" ORDER BY name");

    let mut q = sqlx::query_as::<_, Property>(&sql);
    if let Some(ref city) = query.city {
        q = q.bind(city);
    }
    if let Some(ref category_id) = query.category_id {
        q = q.bind(category_id);
    }
    if let Some(ref search) = query.search {
        q = q.bind(format!("%{}%", search));
    }

    let properties = q.fetch_all(&state.db).await?;

    let mut results = Vec::new();
    for property in properties {
        let starting_price: (Option<i64>,) = sqlx::query_as(
            "SELECT MIN(base_price) FROM rooms WHERE property_id = ?",
        )
        .bind(&property.id)
        .fetch_one(&state.db)
        .await?;

        let room_count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM rooms WHERE property_id = ?",
        )
        .bind(&property.id)
        .fetch_one(&state.db)
        .await?;

        let category_name = category_name(&state, property.category_id.as_deref()).await?;

        results.push(PropertySummary {
            property: PropertyResponse::from(property),
            category_name,
            starting_price: starting_price.0,
            room_count: room_count.0,
        });
    }

    Ok(Json(ApiResponse::new(results)))
}

/// Public property detail with rooms
pub async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PropertyWithRooms>>, ApiError> {
    if let Err(e) = validate_uuid(&id, "property_id") {
        return Err(ApiError::validation_field("property_id", e));
    }

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;

    let rooms = sqlx::query_as::<_, Room>(
        "SELECT * FROM rooms WHERE property_id = ? ORDER BY base_price",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    let category_name = category_name(&state, property.category_id.as_deref()).await?;

    Ok(Json(ApiResponse::new(PropertyWithRooms {
        property: PropertyResponse::from(property),
        category_name,
        rooms: rooms.into_iter().map(RoomResponse::from).collect(),
    })))
}

/// List the tenant's own properties
pub async fn list_my_properties(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<ApiResponse<Vec<PropertyResponse>>>, ApiError> {
    ensure_tenant(&user)?;

    let properties = sqlx::query_as::<_, Property>(
        "SELECT * FROM properties WHERE tenant_id = ? ORDER BY created_at DESC",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::new(
        properties.into_iter().map(PropertyResponse::from).collect(),
    )))
}

/// Create a new property
pub async fn create_property(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PropertyResponse>>), ApiError> {
    ensure_tenant(&user)?;
    validate_create_request(&req)?;

    // The category must exist and belong to this tenant
    if let Some(ref category_id) = req.category_id {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found"))?;
        if category.tenant_id != user.id {
            return Err(ApiError::forbidden("Category belongs to another tenant"));
        }
    }

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO properties (id, tenant_id, category_id, name, description, address, city,
                                latitude, longitude, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&req.category_id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(req.address.trim())
    .bind(req.city.trim())
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(property = %property.name, tenant = %user.id, "Property created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(PropertyResponse::from(property))),
    ))
}

/// Fetch a property and check the caller owns it
async fn owned_property(
    state: &AppState,
    user: &User,
    id: &str,
) -> Result<Property, ApiError> {
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

/// Update a property
pub async fn update_property(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdatePropertyRequest>,
) -> Result<Json<ApiResponse<PropertyResponse>>, ApiError> {
    ensure_tenant(&user)?;
    validate_update_request(&req)?;

    let _existing = owned_property(&state, &user, &id).await?;

    if let Some(ref category_id) = req.category_id {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found"))?;
        if category.tenant_id != user.id {
            return Err(ApiError::forbidden("Category belongs to another tenant"));
        }
    }

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE properties SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            address = COALESCE(?, address),
            city = COALESCE(?, city),
            category_id = COALESCE(?, category_id),
            latitude = COALESCE(?, latitude),
            longitude = COALESCE(?, longitude),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(req.address.as_deref().map(str::trim))
    .bind(req.city.as_deref().map(str::trim))
    .bind(&req.category_id)
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(&now)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(PropertyResponse::from(property))))
}

/// Delete a property with its rooms, rates, and stored images
pub async fn delete_property(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ensure_tenant(&user)?;

    let property = owned_property(&state, &user, &id).await?;

    // Refuse while guests still hold active bookings
    let active: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM bookings b
        JOIN rooms r ON b.room_id = r.id
        WHERE r.property_id = ?
          AND b.status IN ('waiting_payment', 'waiting_confirmation', 'confirmed')
        "#,
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;
    if active.0 > 0 {
        return Err(ApiError::conflict(
            "Property still has active bookings and cannot be deleted",
        ));
    }

    sqlx::query("DELETE FROM properties WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    for image in parse_images(property.images.as_deref()) {
        uploads::remove_upload(&state.config.server.data_dir, &image).await;
    }

    tracing::info!(property = %property.name, tenant = %user.id, "Property deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Attach an uploaded photo to a property
pub async fn upload_property_image(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<PropertyResponse>>, ApiError> {
    ensure_tenant(&user)?;

    let property = owned_property(&state, &user, &id).await?;

    let upload = uploads::read_file_field(&mut multipart).await?;
    let path = uploads::save_image(
        &state.config.server.data_dir,
        "properties",
        &upload,
        IMAGE_CONTENT_TYPES,
        state.config.uploads.image_max_bytes,
    )
    .await?;

    let mut images = parse_images(property.images.as_deref());
    images.push(path);

    sqlx::query("UPDATE properties SET images = ?, updated_at = ? WHERE id = ?")
        .bind(serialize_images(&images))
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&state.db)
        .await?;

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(PropertyResponse::from(property))))
}
