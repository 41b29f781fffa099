//! Overdue and fine calculation
//!
//! One rate, one formula. Everything that shows or persists a fine goes
//! through [`FinePolicy`].

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::Borrowing;
use crate::models::borrowing::BorrowingStatus;

pub const DEFAULT_FINE_PER_DAY: f64 = 0.50;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `today` until `due`. Negative when overdue.
pub fn days_until_due(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

/// Same as [`days_until_due`] for timestamps, rounding partial days up
/// (`ceil((due - now) / 1 day)`).
pub fn days_until_due_at(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (due - now).num_seconds();
    // ceil for both signs
    let days = seconds.div_euclid(SECONDS_PER_DAY);
    if seconds.rem_euclid(SECONDS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

/// Days past due on `today`, 0 when not overdue
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> u32 {
    let days = days_until_due(due, today);
    if days < 0 {
        u32::try_from(-days).unwrap_or(u32::MAX)
    } else {
        0
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinePolicy {
    pub rate_per_day: f64,
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self {
            rate_per_day: DEFAULT_FINE_PER_DAY,
        }
    }
}

impl FinePolicy {
    pub fn new(rate_per_day: f64) -> Self {
        Self { rate_per_day }
    }

    /// Fine for an item due on `due` checked on `today`
    pub fn fine(&self, due: NaiveDate, today: NaiveDate) -> f64 {
        round_cents(days_overdue(due, today) as f64 * self.rate_per_day)
    }

    /// Days a borrowing ran late: up to the return date once returned,
    /// otherwise up to `today`. Lost items keep accruing until `today`.
    pub fn borrowing_days_overdue(&self, borrowing: &Borrowing, today: NaiveDate) -> u32 {
        let until = match (borrowing.returned_date, borrowing.status) {
            (Some(returned), _) => returned,
            (None, BorrowingStatus::Returned) => return 0,
            (None, _) => today,
        };
        days_overdue(borrowing.due_date, until)
    }

    pub fn borrowing_fine(&self, borrowing: &Borrowing, today: NaiveDate) -> f64 {
        round_cents(self.borrowing_days_overdue(borrowing, today) as f64 * self.rate_per_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_future_due_date_has_no_fine() {
        let policy = FinePolicy::default();
        let today = date("2024-06-01");
        for ahead in 0..60 {
            let due = today + Duration::days(ahead);
            assert!(days_until_due(due, today) >= 0);
            assert_eq!(policy.fine(due, today), 0.0);
        }
    }

    #[test]
    fn test_fine_scales_with_days_late() {
        let policy = FinePolicy::default();
        let today = date("2024-06-01");
        for late in 1..40 {
            let due = today - Duration::days(late);
            assert_eq!(days_until_due(due, today), -late);
            assert_eq!(policy.fine(due, today), round_cents(late as f64 * 0.5));
        }
        assert_eq!(policy.fine(today - Duration::days(9), today), 4.50);
    }

    #[test]
    fn test_returned_late_borrowing() {
        let mut borrowing = Borrowing::new(1, 1, date("2024-11-15"), date("2024-12-01"));
        borrowing.returned_date = Some(date("2024-12-10"));
        borrowing.status = BorrowingStatus::Returned;

        let policy = FinePolicy::new(0.50);
        // checked long after the return, still measured at the return date
        assert_eq!(policy.borrowing_days_overdue(&borrowing, date("2025-03-01")), 9);
        assert_eq!(policy.borrowing_fine(&borrowing, date("2025-03-01")), 4.50);
    }

    #[test]
    fn test_configured_rate() {
        let policy = FinePolicy::new(1.25);
        assert_eq!(policy.fine(date("2024-12-01"), date("2024-12-05")), 5.0);
    }

    #[test]
    fn test_partial_days_round_up() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 12, 0, 0).unwrap();
        let due_soon = now + Duration::hours(3);
        assert_eq!(days_until_due_at(due_soon, now), 1);
        let late = now - Duration::hours(30);
        assert_eq!(days_until_due_at(late, now), -1);
        assert_eq!(days_until_due_at(now - Duration::days(2), now), -2);
    }
}
