//! Property models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_images;
use super::room::RoomResponse;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Property {
    pub id: String,
    pub tenant_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// JSON array of uploaded image paths
    pub images: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Response DTO with images decoded from their JSON column
#[derive(Debug, Clone, Serialize)]
pub struct PropertyResponse {
    pub id: String,
    pub tenant_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Property> for PropertyResponse {
    fn from(p: Property) -> Self {
        Self {
            images: parse_images(p.images.as_deref()),
            id: p.id,
            tenant_id: p.tenant_id,
            category_id: p.category_id,
            name: p.name,
            description: p.description,
            address: p.address,
            city: p.city,
            latitude: p.latitude,
            longitude: p.longitude,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Listing entry: property plus the cheapest room price, for search results
#[derive(Debug, Clone, Serialize)]
pub struct PropertySummary {
    #[serde(flatten)]
    pub property: PropertyResponse,
    pub category_name: Option<String>,
    /// Cheapest nightly base price across the property's rooms
    pub starting_price: Option<i64>,
    pub room_count: i64,
}

/// Property detail with its rooms
#[derive(Debug, Serialize)]
pub struct PropertyWithRooms {
    #[serde(flatten)]
    pub property: PropertyResponse,
    pub category_name: Option<String>,
    pub rooms: Vec<RoomResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePropertyRequest {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub category_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePropertyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub category_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Query parameters accepted by the public property listing
#[derive(Debug, Default, Deserialize)]
pub struct PropertyListQuery {
    pub city: Option<String>,
    pub category_id: Option<String>,
    /// Case-insensitive substring match on the property name
    pub search: Option<String>,
}
