//! Booking engine: availability, pricing, and the booking state machine.
//!
//! Handlers call into this module for every decision that is not plain
//! CRUD: whether a stay fits the room inventory, what it costs, and which
//! status transitions are legal.

pub mod availability;
pub mod lifecycle;
pub mod pricing;

pub use availability::*;
pub use lifecycle::*;
pub use pricing::*;

use thiserror::Error;

use crate::db::BookingStatus;

/// Domain errors raised by the booking engine
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("Invalid date format, expected YYYY-MM-DD")]
    InvalidDate,
    #[error("Invalid month format, expected YYYY-MM")]
    InvalidMonth,
    #[error("Check-out must be after check-in")]
    EmptyStay,
    #[error("Not enough rooms available ({remaining} left)")]
    RoomUnavailable { remaining: i64 },
    #[error("Guest count exceeds the capacity of the requested rooms")]
    OverCapacity,
    #[error("Cannot move a booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("Payment deadline has passed")]
    DeadlinePassed,
    #[error("Peak season rates for a room must not overlap")]
    OverlappingRate,
}
