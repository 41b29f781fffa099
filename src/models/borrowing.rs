use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    #[default]
    Borrowed,
    Returned,
    Overdue,
    Lost,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Borrowed => "borrowed",
            BorrowingStatus::Returned => "returned",
            BorrowingStatus::Overdue => "overdue",
            BorrowingStatus::Lost => "lost",
        }
    }

    /// Still holding a copy of the book
    pub fn is_open(&self) -> bool {
        matches!(self, BorrowingStatus::Borrowed | BorrowingStatus::Overdue)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrowing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub book: i64,
    pub borrower: i64,
    #[serde(default, skip_serializing)]
    pub book_title: Option<String>,
    #[serde(default, skip_serializing)]
    pub borrower_name: Option<String>,
    pub borrowed_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub returned_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: BorrowingStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Borrowing {
    pub fn new(book: i64, borrower: i64, borrowed_date: NaiveDate, due_date: NaiveDate) -> Self {
        Self {
            id: None,
            book,
            borrower,
            book_title: None,
            borrower_name: None,
            borrowed_date,
            due_date,
            returned_date: None,
            status: BorrowingStatus::Borrowed,
            notes: None,
        }
    }

    /// Status as of `today`: an open borrowing past its due date is overdue
    /// even if the server has not flagged it yet.
    pub fn effective_status(&self, today: NaiveDate) -> BorrowingStatus {
        match self.status {
            BorrowingStatus::Lost => BorrowingStatus::Lost,
            _ if self.returned_date.is_some() => BorrowingStatus::Returned,
            BorrowingStatus::Returned => BorrowingStatus::Returned,
            _ if today > self.due_date => BorrowingStatus::Overdue,
            _ => BorrowingStatus::Borrowed,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.effective_status(today) == BorrowingStatus::Overdue
    }
}

impl Validate for Borrowing {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.date_order("due_date", self.borrowed_date, self.due_date);
        if let Some(returned) = self.returned_date {
            errors.date_order("returned_date", self.borrowed_date, returned);
        }
        errors.into_result()
    }
}

impl_resource!(Borrowing, "library/borrowings", validated);

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_effective_status() {
        let mut borrowing = Borrowing::new(1, 2, date("2024-11-15"), date("2024-12-01"));
        assert_eq!(
            borrowing.effective_status(date("2024-12-01")),
            BorrowingStatus::Borrowed
        );
        assert_eq!(
            borrowing.effective_status(date("2024-12-02")),
            BorrowingStatus::Overdue
        );

        borrowing.returned_date = Some(date("2024-12-10"));
        assert_eq!(
            borrowing.effective_status(date("2025-01-01")),
            BorrowingStatus::Returned
        );

        borrowing.status = BorrowingStatus::Lost;
        assert_eq!(
            borrowing.effective_status(date("2025-01-01")),
            BorrowingStatus::Lost
        );
    }

    #[test]
    fn test_due_before_borrowed_is_rejected() {
        let borrowing = Borrowing::new(1, 2, date("2024-12-01"), date("2024-11-15"));
        assert!(borrowing.validate().unwrap_err().has("due_date"));
    }
}
