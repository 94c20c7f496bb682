//! Review endpoints: guests review completed stays, tenants reply once.

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
use super::validation::{validate_rating, validate_uuid};
use crate::db::{
    Booking, BookingStatus, CreateReplyRequest, CreateReviewRequest, Property, PropertyReviews,
    Review, ReviewReply, ReviewWithReply, Room, User,
};
use crate::AppState;

fn validate_create_request(req: &CreateReviewRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_uuid(&req.booking_id, "booking_id") {
        errors.add("booking_id", e);
    }
    if let Err(e) = validate_rating(req.rating) {
        errors.add("rating", e);
    }
    if let Some(ref comment) = req.comment {
        if comment.len() > 2000 {
            errors.add("comment", "Comment is too long (max 2000 characters)");
        }
    }

    errors.finish()
}

/// Guest reviews a completed stay (once per booking)
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), ApiError> {
    validate_create_request(&req)?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(&req.booking_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;

    if booking.user_id != user.id {
        return Err(ApiError::forbidden("Not your booking"));
    }

    if booking.status_enum() != BookingStatus::Completed {
        return Err(ApiError::conflict(
            "Only completed stays can be reviewed",
        ));
    }

    let existing: Option<Review> = sqlx::query_as("SELECT * FROM reviews WHERE booking_id = ?")
        .bind(&booking.id)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Booking has already been reviewed"));
    }

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(&booking.room_id)
        .fetch_one(&state.db)
        .await?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO reviews (id, booking_id, property_id, user_id, rating, comment, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&booking.id)
    .bind(&room.property_id)
    .bind(&user.id)
    .bind(req.rating)
    .bind(&req.comment)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(review = %review.id, property = %review.property_id, "Review created");

    Ok((StatusCode::CREATED, Json(ApiResponse::new(review))))
}

/// Tenant posts the single reply to a review
pub async fn reply_review(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<CreateReplyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewReply>>), ApiError> {
    ensure_tenant(&user)?;

    if let Err(e) = validate_uuid(&id, "review_id") {
        return Err(ApiError::validation_field("review_id", e));
    }
    if req.comment.trim().is_empty() {
        return Err(ApiError::validation_field("comment", "Reply is required"));
    }
    if req.comment.len() > 2000 {
        return Err(ApiError::validation_field(
            "comment",
            "Reply is too long (max 2000 characters)",
        ));
    }

    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&review.property_id)
        .fetch_one(&state.db)
        .await?;
    if property.tenant_id != user.id {
        return Err(ApiError::forbidden("Review belongs to another tenant's property"));
    }

    let existing: Option<ReviewReply> =
        sqlx::query_as("SELECT * FROM review_replies WHERE review_id = ?")
            .bind(&review.id)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Review already has a reply"));
    }

    let reply_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO review_replies (id, review_id, tenant_id, comment, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&reply_id)
    .bind(&review.id)
    .bind(&user.id)
    .bind(req.comment.trim())
    .bind(&now)
    .execute(&state.db)
    .await?;

    let reply = sqlx::query_as::<_, ReviewReply>("SELECT * FROM review_replies WHERE id = ?")
        .bind(&reply_id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(reply))))
}

/// Public review listing for a property with the average rating
pub async fn list_property_reviews(
    State(state): State<Arc<AppState>>,
    Path(property_id): Path<String>,
) -> Result<Json<ApiResponse<PropertyReviews>>, ApiError> {
    if let Err(e) = validate_uuid(&property_id, "property_id") {
        return Err(ApiError::validation_field("property_id", e));
    }

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
        .bind(&property_id)
        .fetch_optional(&state.db)
        .await?;
    if property.is_none() {
        return Err(ApiError::not_found("Property not found"));
    }

    let reviews = sqlx::query_as::<_, ReviewWithReply>(
        r#"
        SELECT rv.id, rv.booking_id, rv.property_id, rv.user_id, rv.rating, rv.comment,
               rv.created_at,
               u.name AS reviewer_name,
               rr.comment AS reply_comment, rr.created_at AS reply_created_at
        FROM reviews rv
        JOIN users u ON rv.user_id = u.id
        LEFT JOIN review_replies rr ON rr.review_id = rv.id
        WHERE rv.property_id = ?
        ORDER BY rv.created_at DESC
        "#,
    )
    .bind(&property_id)
    .fetch_all(&state.db)
    .await?;

    let average: (Option<f64>,) = sqlx::query_as(
        "SELECT AVG(rating) FROM reviews WHERE property_id = ?",
    )
    .bind(&property_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ApiResponse::new(PropertyReviews {
        average_rating: average.0,
        review_count: reviews.len() as i64,
        reviews,
    })))
}
