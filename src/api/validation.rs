//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating email addresses (pragmatic, not RFC-complete)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+$"
    ).unwrap();

    /// Regex for YYYY-MM-DD dates (range-checked at parse time)
    static ref DATE_REGEX: Regex = Regex::new(
        r"^\d{4}-\d{2}-\d{2}$"
    ).unwrap();

    /// Regex for YYYY-MM calendar months
    static ref MONTH_REGEX: Regex = Regex::new(
        r"^\d{4}-\d{2}$"
    ).unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a display name (user, category, property, or room)
pub fn validate_name(name: &str, field: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} is required", field));
    }

    if name.len() < 2 {
        return Err(format!("{} is too short (min 2 characters)", field));
    }

    if name.len() > 100 {
        return Err(format!("{} is too long (max 100 characters)", field));
    }

    Ok(())
}

/// Validate an optional free-text description
pub fn validate_description(description: &Option<String>) -> Result<(), String> {
    if let Some(d) = description {
        if d.len() > 2000 {
            return Err("Description is too long (max 2000 characters)".to_string());
        }
    }

    Ok(())
}

/// Validate a YYYY-MM-DD date string
pub fn validate_date(date: &str, field: &str) -> Result<(), String> {
    if date.is_empty() {
        return Err(format!("{} is required", field));
    }

    if !DATE_REGEX.is_match(date) {
        return Err(format!("Invalid {} format. Use YYYY-MM-DD", field));
    }

    if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(format!("Invalid {}: no such date", field));
    }

    Ok(())
}

/// Validate a YYYY-MM month string
pub fn validate_month(month: &str) -> Result<(), String> {
    if !MONTH_REGEX.is_match(month) {
        return Err("Invalid month format. Use YYYY-MM".to_string());
    }

    let with_day = format!("{}-01", month);
    if chrono::NaiveDate::parse_from_str(&with_day, "%Y-%m-%d").is_err() {
        return Err("Invalid month: no such month".to_string());
    }

    Ok(())
}

/// Validate a nightly price in minor units
pub fn validate_price(price: i64) -> Result<(), String> {
    if price <= 0 {
        return Err("Price must be greater than 0".to_string());
    }

    Ok(())
}

/// Validate a room capacity
pub fn validate_capacity(capacity: i64) -> Result<(), String> {
    if capacity < 1 {
        return Err("Capacity must be at least 1".to_string());
    }

    if capacity > 32 {
        return Err("Capacity is too high (max 32 guests per room)".to_string());
    }

    Ok(())
}

/// Validate a requested room count
pub fn validate_room_count(room_count: i64) -> Result<(), String> {
    if room_count < 1 {
        return Err("Room count must be at least 1".to_string());
    }

    if room_count > 100 {
        return Err("Room count exceeds the room inventory".to_string());
    }

    Ok(())
}

/// Validate a guest count
pub fn validate_guest_count(guest_count: i64) -> Result<(), String> {
    if guest_count < 1 {
        return Err("Guest count must be at least 1".to_string());
    }

    Ok(())
}

/// Validate a review rating
pub fn validate_rating(rating: i64) -> Result<(), String> {
    if !(1..=5).contains(&rating) {
        return Err("Rating must be between 1 and 5".to_string());
    }

    Ok(())
}

/// Validate a peak season adjustment
pub fn validate_adjustment(adjustment_type: &str, value: i64) -> Result<(), String> {
    match adjustment_type {
        "fixed" => {
            if value <= 0 {
                return Err("Fixed adjustment must be greater than 0".to_string());
            }
        }
        "percentage" => {
            if !(1..=100).contains(&value) {
                return Err("Percentage adjustment must be between 1 and 100".to_string());
            }
        }
        _ => {
            return Err("Adjustment type must be 'fixed' or 'percentage'".to_string());
        }
    }

    Ok(())
}

/// Validate an optional latitude/longitude pair
pub fn validate_geolocation(latitude: &Option<f64>, longitude: &Option<f64>) -> Result<(), String> {
    match (latitude, longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(lat) {
                return Err("Latitude must be between -90 and 90".to_string());
            }
            if !(-180.0..=180.0).contains(lon) {
                return Err("Longitude must be between -180 and 180".to_string());
            }
            Ok(())
        }
        _ => Err("Latitude and longitude must be provided together".to_string()),
    }
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

/// Valid account roles
const VALID_ROLES: [&str; 2] = ["user", "tenant"];

/// Validate an account role
pub fn validate_role(role: &str) -> Result<(), String> {
    if !VALID_ROLES.contains(&role) {
        return Err(format!(
            "Invalid role. Must be one of: {}",
            VALID_ROLES.join(", ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("guest@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Beach Villa", "Property name").is_ok());

        assert!(validate_name("", "Property name").is_err());
        assert!(validate_name("x", "Property name").is_err());
        assert!(validate_name(&"x".repeat(101), "Property name").is_err());
    }

    #[test]
    fn test_validate_date() {
        assert!(validate_date("2026-06-10", "check_in").is_ok());

        assert!(validate_date("", "check_in").is_err());
        assert!(validate_date("10-06-2026", "check_in").is_err());
        assert!(validate_date("2026-02-30", "check_in").is_err());
    }

    #[test]
    fn test_validate_month() {
        assert!(validate_month("2026-06").is_ok());
        assert!(validate_month("2026-13").is_err());
        assert!(validate_month("junk").is_err());
    }

    #[test]
    fn test_validate_price_and_counts() {
        assert!(validate_price(50_000).is_ok());
        assert!(validate_price(0).is_err());
        assert!(validate_price(-1).is_err());

        assert!(validate_capacity(2).is_ok());
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(33).is_err());

        assert!(validate_room_count(1).is_ok());
        assert!(validate_room_count(100).is_ok());
        assert!(validate_room_count(0).is_err());
        assert!(validate_room_count(101).is_err());

        assert!(validate_guest_count(1).is_ok());
        assert!(validate_guest_count(0).is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_adjustment() {
        assert!(validate_adjustment("fixed", 25_000).is_ok());
        assert!(validate_adjustment("percentage", 20).is_ok());

        assert!(validate_adjustment("fixed", 0).is_err());
        assert!(validate_adjustment("percentage", 0).is_err());
        assert!(validate_adjustment("percentage", 101).is_err());
        assert!(validate_adjustment("nominal", 10).is_err());
    }

    #[test]
    fn test_validate_geolocation() {
        assert!(validate_geolocation(&None, &None).is_ok());
        assert!(validate_geolocation(&Some(-8.65), &Some(115.21)).is_ok());

        assert!(validate_geolocation(&Some(91.0), &Some(0.0)).is_err());
        assert!(validate_geolocation(&Some(0.0), &Some(181.0)).is_err());
        assert!(validate_geolocation(&Some(0.0), &None).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "room_id").is_ok());
        assert!(validate_uuid("", "room_id").is_err());
        assert!(validate_uuid("not-a-uuid", "room_id").is_err());
    }

    #[test]
    fn test_validate_role() {
        assert!(validate_role("user").is_ok());
        assert!(validate_role("tenant").is_ok());
        assert!(validate_role("admin").is_err());
    }
}
