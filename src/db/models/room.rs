//! Room models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_images;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: String,
    pub property_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Nightly base price in minor currency units
    pub base_price: i64,
    /// Max guests per room unit
    pub capacity: i64,
    /// JSON array of uploaded image paths
    pub images: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub property_id: String,
    pub name: String,
    pub description: Option<String>,
    pub base_price: i64,
    pub capacity: i64,
    pub images: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Room> for RoomResponse {
    fn from(r: Room) -> Self {
        Self {
            images: parse_images(r.images.as_deref()),
            id: r.id,
            property_id: r.property_id,
            name: r.name,
            description: r.description,
            base_price: r.base_price,
            capacity: r.capacity,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: Option<String>,
    pub base_price: i64,
    pub capacity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoomRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<i64>,
    pub capacity: Option<i64>,
}

/// One day in a room's availability calendar
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarDay {
    /// YYYY-MM-DD
    pub date: String,
    /// Nightly price for this date after peak/weekend adjustment
    pub price: i64,
    /// Whether a peak season rate applied to this date
    pub peak_season: bool,
    /// Units still free out of the room cap
    pub remaining_units: i64,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// Month to render, YYYY-MM
    pub month: String,
}
