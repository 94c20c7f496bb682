//! Booking models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    WaitingPayment,
    WaitingConfirmation,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingPayment => write!(f, "waiting_payment"),
            Self::WaitingConfirmation => write!(f, "waiting_confirmation"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "waiting_confirmation" => Self::WaitingConfirmation,
            "confirmed" => Self::Confirmed,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::WaitingPayment,
        }
    }
}

/// Why a booking ended up cancelled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    PaymentTimeout,
    PaymentFailed,
    UserCancelled,
    TenantCancelled,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PaymentTimeout => write!(f, "payment_timeout"),
            Self::PaymentFailed => write!(f, "payment_failed"),
            Self::UserCancelled => write!(f, "user_cancelled"),
            Self::TenantCancelled => write!(f, "tenant_cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub room_id: String,
    /// Denormalized owner of the booked property
    pub tenant_id: String,
    pub check_in: String,
    pub check_out: String,
    pub room_count: i64,
    pub guest_count: i64,
    pub total_price: i64,
    pub status: String,
    pub payment_proof: Option<String>,
    pub payment_deadline: Option<String>,
    pub cancelled_reason: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_status: Option<String>,
    #[serde(default)]
    pub reminder_sent: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    pub fn status_enum(&self) -> BookingStatus {
        BookingStatus::from(self.status.clone())
    }
}

/// Booking joined with room/property names for list views
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookingWithDetails {
    pub id: String,
    pub user_id: String,
    pub room_id: String,
    pub tenant_id: String,
    pub check_in: String,
    pub check_out: String,
    pub room_count: i64,
    pub guest_count: i64,
    pub total_price: i64,
    pub status: String,
    pub payment_proof: Option<String>,
    pub payment_deadline: Option<String>,
    pub cancelled_reason: Option<String>,
    pub created_at: String,
    pub room_name: String,
    pub property_id: String,
    pub property_name: String,
    pub guest_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: String,
    pub check_in: String,
    pub check_out: String,
    #[serde(default = "default_room_count")]
    pub room_count: i64,
    pub guest_count: i64,
    /// Pay through the gateway instead of manual transfer
    #[serde(default)]
    pub use_gateway: bool,
}

fn default_room_count() -> i64 {
    1
}

/// Returned on creation; carries the gateway handoff when requested
#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_redirect_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    /// Only bookings with a check-in on or after today
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Deserialize)]
pub struct TenantCancelRequest {
    pub reason: Option<String>,
}
