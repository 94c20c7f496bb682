//! Database models split into domain-specific modules.
//!
//! This module re-exports all types for backwards compatibility.

pub mod booking;
pub mod category;
pub mod common;
pub mod peak_season_rate;
pub mod property;
pub mod review;
pub mod room;
pub mod user;

// Re-export all types for backwards compatibility
pub use booking::*;
pub use category::*;
pub use common::*;
pub use peak_season_rate::*;
pub use property::*;
pub use review::*;
pub use room::*;
pub use user::*;
