//! Booking status state machine.
//!
//! WAITING_PAYMENT -> WAITING_CONFIRMATION -> CONFIRMED -> COMPLETED, with
//! side exits to CANCELLED. The only backwards edge is the tenant
//! rejecting a payment proof, which returns the booking to
//! WAITING_PAYMENT with a fresh one-hour deadline.

use chrono::{DateTime, Duration, Utc};

use super::BookingError;
use crate::db::BookingStatus;

/// Deadline granted after a tenant rejects a payment proof
pub const REJECT_DEADLINE_MINUTES: i64 = 60;

/// Whether the state machine allows moving `from` -> `to`
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (WaitingPayment, WaitingConfirmation)
            | (WaitingPayment, Confirmed)
            | (WaitingPayment, Cancelled)
            | (WaitingConfirmation, WaitingPayment)
            | (WaitingConfirmation, Confirmed)
            | (WaitingConfirmation, Cancelled)
            | (Confirmed, Completed)
    )
}

/// Validate a transition, returning a typed error for handlers to map
pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), BookingError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition { from, to })
    }
}

/// Payment deadline `minutes` from `now`, as stored in the database
pub fn payment_deadline(now: DateTime<Utc>, minutes: i64) -> String {
    (now + Duration::minutes(minutes)).to_rfc3339()
}

/// Whether a stored deadline lies in the past
pub fn is_deadline_passed(deadline: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(deadline) {
        Ok(t) => t.with_timezone(&Utc) < now,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BookingStatus::*;

    #[test]
    fn test_forward_transitions() {
        assert!(can_transition(WaitingPayment, WaitingConfirmation));
        assert!(can_transition(WaitingConfirmation, Confirmed));
        assert!(can_transition(Confirmed, Completed));
    }

    #[test]
    fn test_gateway_skips_manual_confirmation() {
        // Gateway settlement confirms straight from waiting_payment
        assert!(can_transition(WaitingPayment, Confirmed));
    }

    #[test]
    fn test_reject_payment_is_the_only_backwards_edge() {
        assert!(can_transition(WaitingConfirmation, WaitingPayment));
        assert!(!can_transition(Confirmed, WaitingPayment));
        assert!(!can_transition(Confirmed, WaitingConfirmation));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for to in [WaitingPayment, WaitingConfirmation, Confirmed, Completed, Cancelled] {
            assert!(!can_transition(Cancelled, to));
            assert!(!can_transition(Completed, to));
        }
        assert!(Cancelled.is_terminal());
        assert!(Completed.is_terminal());
        assert!(!Confirmed.is_terminal());
    }

    #[test]
    fn test_confirmed_cannot_be_cancelled() {
        assert!(!can_transition(Confirmed, Cancelled));
    }

    #[test]
    fn test_ensure_transition_error_names_states() {
        let err = ensure_transition(Completed, Confirmed).unwrap_err();
        assert_eq!(
            err,
            BookingError::InvalidTransition {
                from: Completed,
                to: Confirmed
            }
        );
    }

    #[test]
    fn test_payment_deadline_is_exactly_n_minutes_ahead() {
        let now = DateTime::parse_from_rfc3339("2026-06-10T10:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        let deadline = payment_deadline(now, REJECT_DEADLINE_MINUTES);
        let parsed = DateTime::parse_from_rfc3339(&deadline).unwrap();
        assert_eq!(parsed.with_timezone(&Utc) - now, Duration::minutes(60));
    }

    #[test]
    fn test_is_deadline_passed() {
        let now = DateTime::parse_from_rfc3339("2026-06-10T10:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert!(is_deadline_passed("2026-06-10T09:59:59+00:00", now));
        assert!(!is_deadline_passed("2026-06-10T10:00:01+00:00", now));
        assert!(!is_deadline_passed("garbage", now));
    }
}
