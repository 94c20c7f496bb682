//! Room-inventory availability checks.
//!
//! A room row represents a room *type* with a fixed inventory of
//! [`ROOM_UNIT_CAP`] units. A stay blocks inventory while its booking sits
//! in a blocking status; cancelled and completed bookings free it. Two
//! stays overlap when `check_in < other.check_out && check_out > other.check_in`
//! (check-out day itself is free for the next guest).

use chrono::NaiveDate;
use serde::Serialize;

use super::BookingError;
use crate::db::DbPool;

/// Fixed inventory per room type
pub const ROOM_UNIT_CAP: i64 = 100;

/// A validated half-open stay range (check-out day excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    /// Parse and validate a check-in/check-out pair
    pub fn parse(check_in: &str, check_out: &str) -> Result<Self, BookingError> {
        let check_in = parse_date(check_in)?;
        let check_out = parse_date(check_out)?;
        if check_out <= check_in {
            return Err(BookingError::EmptyStay);
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Number of nights in the stay
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// Parse a YYYY-MM-DD date
pub fn parse_date(s: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| BookingError::InvalidDate)
}

/// Outcome of an availability check
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Availability {
    /// Units reserved by overlapping bookings in blocking statuses
    pub reserved: i64,
    /// Units still free out of the cap
    pub remaining: i64,
    pub available: bool,
}

/// Sum the units reserved by blocking bookings overlapping the stay
pub async fn reserved_units(
    db: &DbPool,
    room_id: &str,
    range: &StayRange,
) -> Result<i64, sqlx::Error> {
    let (reserved,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(room_count), 0) FROM bookings
        WHERE room_id = ?
          AND status IN ('waiting_payment', 'waiting_confirmation', 'confirmed')
          AND check_in < ?
          AND check_out > ?
        "#,
    )
    .bind(room_id)
    .bind(range.check_out.format("%Y-%m-%d").to_string())
    .bind(range.check_in.format("%Y-%m-%d").to_string())
    .fetch_one(db)
    .await?;

    Ok(reserved)
}

/// Units reserved on a single night, for the calendar view
pub async fn reserved_units_for_day(
    db: &DbPool,
    room_id: &str,
    day: NaiveDate,
) -> Result<i64, sqlx::Error> {
    let day = day.format("%Y-%m-%d").to_string();
    let (reserved,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(room_count), 0) FROM bookings
        WHERE room_id = ?
          AND status IN ('waiting_payment', 'waiting_confirmation', 'confirmed')
          AND check_in <= ?
          AND check_out > ?
        "#,
    )
    .bind(room_id)
    .bind(&day)
    .bind(&day)
    .fetch_one(db)
    .await?;

    Ok(reserved)
}

/// Check whether `requested` more units fit into the room's inventory
pub async fn check(
    db: &DbPool,
    room_id: &str,
    range: &StayRange,
    requested: i64,
) -> Result<Availability, sqlx::Error> {
    let reserved = reserved_units(db, room_id, range).await?;
    let remaining = (ROOM_UNIT_CAP - reserved).max(0);

    Ok(Availability {
        reserved,
        remaining,
        available: reserved + requested <= ROOM_UNIT_CAP,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::init(dir.path()).await.unwrap();
        (dir, pool)
    }

    async fn seed_room(pool: &DbPool) -> (String, String, String) {
        let tenant_id = "tenant-1".to_string();
        let room_id = "room-1".to_string();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
             VALUES (?, 'owner@example.com', 'x', 'Owner', 'tenant', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(&tenant_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
             VALUES ('guest-1', 'guest@example.com', 'x', 'Guest', 'user', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO properties (id, tenant_id, name, address, city, created_at, updated_at)
             VALUES ('prop-1', ?, 'Villa', 'Main St 1', 'Denpasar', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(&tenant_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO rooms (id, property_id, name, base_price, capacity, created_at, updated_at)
             VALUES (?, 'prop-1', 'Deluxe', 50000, 2, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(&room_id)
        .execute(pool)
        .await
        .unwrap();
        (tenant_id, "guest-1".to_string(), room_id)
    }

    async fn insert_booking(
        pool: &DbPool,
        id: &str,
        room_id: &str,
        check_in: &str,
        check_out: &str,
        room_count: i64,
        status: &str,
    ) {
        sqlx::query(
            "INSERT INTO bookings (id, user_id, room_id, tenant_id, check_in, check_out,
                                   room_count, guest_count, total_price, status, created_at, updated_at)
             VALUES (?, 'guest-1', ?, 'tenant-1', ?, ?, ?, 2, 100000, ?,
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(room_id)
        .bind(check_in)
        .bind(check_out)
        .bind(room_count)
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn test_stay_range_rejects_bad_input() {
        assert_eq!(
            StayRange::parse("2026-13-01", "2026-12-05"),
            Err(BookingError::InvalidDate)
        );
        assert_eq!(
            StayRange::parse("2026-06-10", "2026-06-10"),
            Err(BookingError::EmptyStay)
        );
        assert_eq!(
            StayRange::parse("2026-06-10", "2026-06-08"),
            Err(BookingError::EmptyStay)
        );
    }

    #[test]
    fn test_nights() {
        let range = StayRange::parse("2026-06-10", "2026-06-13").unwrap();
        assert_eq!(range.nights(), 3);
    }

    #[tokio::test]
    async fn test_overlapping_bookings_block_inventory() {
        let (_dir, pool) = test_pool().await;
        let (_, _, room_id) = seed_room(&pool).await;

        insert_booking(&pool, "b1", &room_id, "2026-06-10", "2026-06-15", 40, "confirmed").await;
        insert_booking(&pool, "b2", &room_id, "2026-06-12", "2026-06-14", 30, "waiting_payment").await;

        let range = StayRange::parse("2026-06-13", "2026-06-16").unwrap();
        let avail = check(&pool, &room_id, &range, 20).await.unwrap();
        assert_eq!(avail.reserved, 70);
        assert_eq!(avail.remaining, 30);
        assert!(avail.available);

        // One more unit than fits
        let avail = check(&pool, &room_id, &range, 31).await.unwrap();
        assert!(!avail.available);
    }

    #[tokio::test]
    async fn test_cancelled_and_completed_do_not_block() {
        let (_dir, pool) = test_pool().await;
        let (_, _, room_id) = seed_room(&pool).await;

        insert_booking(&pool, "b1", &room_id, "2026-06-10", "2026-06-15", 100, "cancelled").await;
        insert_booking(&pool, "b2", &room_id, "2026-06-10", "2026-06-15", 100, "completed").await;

        let range = StayRange::parse("2026-06-10", "2026-06-15").unwrap();
        let avail = check(&pool, &room_id, &range, 100).await.unwrap();
        assert_eq!(avail.reserved, 0);
        assert!(avail.available);
    }

    #[tokio::test]
    async fn test_checkout_day_is_free() {
        let (_dir, pool) = test_pool().await;
        let (_, _, room_id) = seed_room(&pool).await;

        insert_booking(&pool, "b1", &room_id, "2026-06-10", "2026-06-15", 100, "confirmed").await;

        // Back-to-back stay starting on the earlier check-out day
        let range = StayRange::parse("2026-06-15", "2026-06-18").unwrap();
        let avail = check(&pool, &room_id, &range, 100).await.unwrap();
        assert_eq!(avail.reserved, 0);
        assert!(avail.available);
    }

    #[tokio::test]
    async fn test_reserved_units_for_day() {
        let (_dir, pool) = test_pool().await;
        let (_, _, room_id) = seed_room(&pool).await;

        insert_booking(&pool, "b1", &room_id, "2026-06-10", "2026-06-12", 25, "confirmed").await;

        let on_stay = parse_date("2026-06-11").unwrap();
        let on_checkout = parse_date("2026-06-12").unwrap();
        assert_eq!(reserved_units_for_day(&pool, &room_id, on_stay).await.unwrap(), 25);
        assert_eq!(reserved_units_for_day(&pool, &room_id, on_checkout).await.unwrap(), 0);
    }
}
