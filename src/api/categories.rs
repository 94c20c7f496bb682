//! Category endpoints for grouping a tenant's properties.

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
use super::validation::{validate_name, validate_uuid};
use crate::db::{
    Category, CategoryWithPropertyCount, CreateCategoryRequest, UpdateCategoryRequest, User,
};
use crate::AppState;

fn validate_create_request(req: &CreateCategoryRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name, "Category name") {
        errors.add("name", e);
    }

    errors.finish()
}

/// List the tenant's categories with property counts
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<ApiResponse<Vec<CategoryWithPropertyCount>>>, ApiError> {
    ensure_tenant(&user)?;

    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE tenant_id = ? ORDER BY name",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut results = Vec::new();
    for category in categories {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM properties WHERE category_id = ?",
        )
        .bind(&category.id)
        .fetch_one(&state.db)
        .await?;

        results.push(CategoryWithPropertyCount {
            id: category.id,
            tenant_id: category.tenant_id,
            name: category.name,
            created_at: category.created_at,
            updated_at: category.updated_at,
            property_count: count.0,
        });
    }

    Ok(Json(ApiResponse::new(results)))
}

/// Create a new category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ApiError> {
    ensure_tenant(&user)?;
    validate_create_request(&req)?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO categories (id, tenant_id, name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(req.name.trim())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create category: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("A category with this name already exists")
        } else {
            ApiError::database("Failed to create category")
        }
    })?;

    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(category))))
}

/// Rename a category
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    ensure_tenant(&user)?;

    if let Err(e) = validate_uuid(&id, "category_id") {
        return Err(ApiError::validation_field("category_id", e));
    }
    if let Some(ref name) = req.name {
        if let Err(e) = validate_name(name, "Category name") {
            return Err(ApiError::validation_field("name", e));
        }
    }

    let existing = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    if existing.tenant_id != user.id {
        return Err(ApiError::forbidden("Category belongs to another tenant"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE categories SET
            name = COALESCE(?, name),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&now)
    .bind(&id)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update category: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("A category with this name already exists")
        } else {
            ApiError::database("Failed to update category")
        }
    })?;

    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(ApiResponse::new(category)))
}

/// Delete a category (properties keep existing without one)
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ensure_tenant(&user)?;

    if let Err(e) = validate_uuid(&id, "category_id") {
        return Err(ApiError::validation_field("category_id", e));
    }

    let existing = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    if existing.tenant_id != user.id {
        return Err(ApiError::forbidden("Category belongs to another tenant"));
    }

    // Properties keep existing with category_id reset by ON DELETE SET NULL
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
