//! Peak season rate models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How a peak season rate adjusts the base price
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    /// Nominal amount in minor units
    Fixed,
    /// Whole-percent uplift on the base price
    Percentage,
}

impl std::fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Percentage => write!(f, "percentage"),
        }
    }
}

impl From<String> for AdjustmentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "percentage" => Self::Percentage,
            _ => Self::Fixed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PeakSeasonRate {
    pub id: String,
    pub room_id: String,
    /// Inclusive range, YYYY-MM-DD
    pub start_date: String,
    pub end_date: String,
    pub adjustment_type: String,
    pub value: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl PeakSeasonRate {
    pub fn adjustment_enum(&self) -> AdjustmentType {
        AdjustmentType::from(self.adjustment_type.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePeakSeasonRateRequest {
    pub start_date: String,
    pub end_date: String,
    pub adjustment_type: String,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePeakSeasonRateRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub adjustment_type: Option<String>,
    pub value: Option<i64>,
}
