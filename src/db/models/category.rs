use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
}

/// Category with the number of properties assigned to it
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithPropertyCount {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub property_count: i64,
}
