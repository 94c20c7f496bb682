//! Nightly and booking-level price calculation.
//!
//! A booking total starts from `base_price x nights x room_count` and the
//! first peak season rate overlapping the stay adjusts the subtotal. The
//! day-by-day calendar uses the same peak lookup per date but falls back
//! to a weekend uplift when no rate matches; booking totals never apply
//! the weekend uplift, so the calendar is an estimate only.

use chrono::{Datelike, NaiveDate, Weekday};

use super::availability::StayRange;
use super::BookingError;
use crate::db::{AdjustmentType, PeakSeasonRate};

/// Weekend uplift applied by the calendar when no peak rate matches
pub const WEEKEND_UPLIFT_PERCENT: i64 = 20;

/// Increase `amount` by `percent`, rounding half-up
fn apply_percentage(amount: i64, percent: i64) -> i64 {
    amount + (amount * percent + 50) / 100
}

/// Whether `day` falls inside the rate's inclusive range
fn rate_covers_day(rate: &PeakSeasonRate, day: NaiveDate) -> bool {
    let day = day.format("%Y-%m-%d").to_string();
    rate.start_date.as_str() <= day.as_str() && day.as_str() <= rate.end_date.as_str()
}

/// Whether the rate's inclusive range touches any night of the stay
fn rate_overlaps_stay(rate: &PeakSeasonRate, range: &StayRange) -> bool {
    let check_in = range.check_in.format("%Y-%m-%d").to_string();
    // Last night of the stay is the day before check-out
    let last_night = (range.check_out - chrono::Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();
    rate.start_date.as_str() <= last_night.as_str() && rate.end_date.as_str() >= check_in.as_str()
}

/// Two inclusive date ranges overlap
pub fn rate_ranges_overlap(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Total price for a stay.
///
/// `rates` must be ordered by start_date; the first rate overlapping the
/// stay wins. Percentage rates scale the subtotal, fixed rates add their
/// nominal value once.
pub fn booking_total(
    base_price: i64,
    range: &StayRange,
    room_count: i64,
    rates: &[PeakSeasonRate],
) -> i64 {
    let subtotal = base_price * range.nights() * room_count;

    match rates.iter().find(|r| rate_overlaps_stay(r, range)) {
        Some(rate) => match rate.adjustment_enum() {
            AdjustmentType::Percentage => apply_percentage(subtotal, rate.value),
            AdjustmentType::Fixed => subtotal + rate.value,
        },
        None => subtotal,
    }
}

/// Nightly price for a single date plus whether a peak rate applied.
///
/// Falls back to the weekend uplift on Saturdays and Sundays when no peak
/// rate covers the date.
pub fn day_price(base_price: i64, day: NaiveDate, rates: &[PeakSeasonRate]) -> (i64, bool) {
    if let Some(rate) = rates.iter().find(|r| rate_covers_day(r, day)) {
        let price = match rate.adjustment_enum() {
            AdjustmentType::Percentage => apply_percentage(base_price, rate.value),
            AdjustmentType::Fixed => base_price + rate.value,
        };
        return (price, true);
    }

    match day.weekday() {
        Weekday::Sat | Weekday::Sun => (apply_percentage(base_price, WEEKEND_UPLIFT_PERCENT), false),
        _ => (base_price, false),
    }
}

/// All days of a YYYY-MM month
pub fn month_days(month: &str) -> Result<Vec<NaiveDate>, BookingError> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidMonth)?;

    let mut days = Vec::with_capacity(31);
    let mut day = first;
    while day.month() == first.month() {
        days.push(day);
        day += chrono::Duration::days(1);
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(start: &str, end: &str, adjustment_type: &str, value: i64) -> PeakSeasonRate {
        PeakSeasonRate {
            id: "rate-1".to_string(),
            room_id: "room-1".to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            adjustment_type: adjustment_type.to_string(),
            value,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn range(check_in: &str, check_out: &str) -> StayRange {
        StayRange::parse(check_in, check_out).unwrap()
    }

    #[test]
    fn test_booking_total_without_rates() {
        // 3 nights x 2 rooms x 50_000
        let total = booking_total(50_000, &range("2026-06-10", "2026-06-13"), 2, &[]);
        assert_eq!(total, 300_000);
    }

    #[test]
    fn test_booking_total_percentage_rate() {
        let rates = vec![rate("2026-06-01", "2026-06-30", "percentage", 25)];
        let total = booking_total(50_000, &range("2026-06-10", "2026-06-12"), 1, &rates);
        // 100_000 + 25%
        assert_eq!(total, 125_000);
    }

    #[test]
    fn test_booking_total_fixed_rate_added_once() {
        let rates = vec![rate("2026-06-01", "2026-06-30", "fixed", 30_000)];
        let total = booking_total(50_000, &range("2026-06-10", "2026-06-13"), 2, &rates);
        assert_eq!(total, 300_000 + 30_000);
    }

    #[test]
    fn test_booking_total_first_matching_rate_wins() {
        let rates = vec![
            rate("2026-06-01", "2026-06-15", "fixed", 10_000),
            rate("2026-06-16", "2026-06-30", "percentage", 50),
        ];
        let total = booking_total(50_000, &range("2026-06-14", "2026-06-18"), 1, &rates);
        // 4 nights, first rate overlaps (stay begins on the 14th)
        assert_eq!(total, 200_000 + 10_000);
    }

    #[test]
    fn test_booking_total_ignores_rate_ending_before_stay() {
        let rates = vec![rate("2026-06-01", "2026-06-09", "percentage", 50)];
        let total = booking_total(50_000, &range("2026-06-10", "2026-06-12"), 1, &rates);
        assert_eq!(total, 100_000);
    }

    #[test]
    fn test_booking_total_has_no_weekend_uplift() {
        // 2026-06-13 is a Saturday; weekend nights do not change the total
        let total = booking_total(50_000, &range("2026-06-12", "2026-06-15"), 1, &[]);
        assert_eq!(total, 150_000);
    }

    #[test]
    fn test_day_price_peak_beats_weekend() {
        let rates = vec![rate("2026-06-13", "2026-06-14", "fixed", 5_000)];
        // Saturday inside the rate range: rate applies, not the uplift
        let saturday = NaiveDate::from_ymd_opt(2026, 6, 13).unwrap();
        assert_eq!(day_price(50_000, saturday, &rates), (55_000, true));
    }

    #[test]
    fn test_day_price_weekend_fallback() {
        let saturday = NaiveDate::from_ymd_opt(2026, 6, 13).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 6, 14).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        assert_eq!(day_price(50_000, saturday, &[]), (60_000, false));
        assert_eq!(day_price(50_000, sunday, &[]), (60_000, false));
        assert_eq!(day_price(50_000, monday, &[]), (50_000, false));
    }

    #[test]
    fn test_percentage_rounding_half_up() {
        // 333 * 20% = 66.6 -> 67
        assert_eq!(apply_percentage(333, 20), 400);
    }

    #[test]
    fn test_rate_ranges_overlap() {
        assert!(rate_ranges_overlap("2026-06-01", "2026-06-10", "2026-06-10", "2026-06-20"));
        assert!(rate_ranges_overlap("2026-06-05", "2026-06-25", "2026-06-01", "2026-06-30"));
        assert!(!rate_ranges_overlap("2026-06-01", "2026-06-09", "2026-06-10", "2026-06-20"));
    }

    #[test]
    fn test_month_days() {
        let days = month_days("2026-02").unwrap();
        assert_eq!(days.len(), 28);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(*days.last().unwrap(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());

        assert_eq!(month_days("2026-13"), Err(BookingError::InvalidMonth));
        assert_eq!(month_days("junk"), Err(BookingError::InvalidMonth));
    }
}
