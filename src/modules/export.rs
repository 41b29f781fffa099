//! CSV exports
//!
//! Rows are flat serde structs written with the `csv` crate; headers come
//! from the field names.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Borrowing, Fine, FineStatus, Invoice};
use crate::services::fine_service::FinePolicy;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of the fines report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FineReportRow {
    pub fine_id: Option<i64>,
    pub borrowing_id: i64,
    pub book: String,
    pub borrower: String,
    pub due_date: Option<NaiveDate>,
    pub returned_date: Option<NaiveDate>,
    pub days_overdue: u32,
    pub amount: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueRow {
    pub borrowing_id: Option<i64>,
    pub book: String,
    pub borrower: String,
    pub due_date: NaiveDate,
    pub days_overdue: u32,
    pub fine_to_date: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRow {
    pub invoice_id: Option<i64>,
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub total: f64,
    pub paid: f64,
    pub balance: f64,
}

fn fine_status_label(status: FineStatus) -> &'static str {
    match status {
        FineStatus::Pending => "pending",
        FineStatus::Paid => "paid",
        FineStatus::Waived => "waived",
    }
}

fn book_label(b: &Borrowing) -> String {
    b.book_title
        .clone()
        .unwrap_or_else(|| format!("Book #{}", b.book))
}

fn borrower_label(b: &Borrowing) -> String {
    b.borrower_name
        .clone()
        .unwrap_or_else(|| format!("Member #{}", b.borrower))
}

/// Join fines with their borrowings. Fines whose borrowing is not in
/// `borrowings` still get a row, with placeholder labels.
pub fn fine_report(fines: &[Fine], borrowings: &[Borrowing]) -> Vec<FineReportRow> {
    let by_id: HashMap<i64, &Borrowing> = borrowings
        .iter()
        .filter_map(|b| b.id.map(|id| (id, b)))
        .collect();

    fines
        .iter()
        .map(|fine| {
            let borrowing = by_id.get(&fine.borrowing);
            FineReportRow {
                fine_id: fine.id,
                borrowing_id: fine.borrowing,
                book: borrowing
                    .map(|b| book_label(b))
                    .unwrap_or_else(|| "-".to_string()),
                borrower: borrowing
                    .map(|b| borrower_label(b))
                    .unwrap_or_else(|| "-".to_string()),
                due_date: borrowing.map(|b| b.due_date),
                returned_date: borrowing.and_then(|b| b.returned_date),
                days_overdue: fine.days_overdue.unwrap_or(0),
                amount: fine.amount,
                status: fine_status_label(fine.status).to_string(),
            }
        })
        .collect()
}

pub fn overdue_report(
    borrowings: &[Borrowing],
    policy: FinePolicy,
    today: NaiveDate,
) -> Vec<OverdueRow> {
    borrowings
        .iter()
        .filter(|b| b.is_overdue(today))
        .map(|b| OverdueRow {
            borrowing_id: b.id,
            book: book_label(b),
            borrower: borrower_label(b),
            due_date: b.due_date,
            days_overdue: policy.borrowing_days_overdue(b, today),
            fine_to_date: policy.borrowing_fine(b, today),
        })
        .collect()
}

pub fn invoice_report(invoices: &[Invoice]) -> Vec<InvoiceRow> {
    invoices
        .iter()
        .map(|i| InvoiceRow {
            invoice_id: i.id,
            number: i.number.clone().unwrap_or_default(),
            issue_date: i.issue_date,
            due_date: i.due_date,
            status: serde_json::to_value(i.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            total: i.total(),
            paid: i.amount_paid,
            balance: i.balance(),
        })
        .collect()
}

/// Write rows with a header line; returns the number of data rows
pub fn write_csv<T: Serialize, W: Write>(rows: &[T], writer: W) -> Result<usize, ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

pub fn export_to_path<T: Serialize>(rows: &[T], path: &Path) -> Result<usize, ExportError> {
    let file = File::create(path)?;
    let written = write_csv(rows, file)?;
    tracing::info!("Exported {} rows to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_fine_report_csv() {
        let mut borrowing = Borrowing::new(7, 3, day(1), day(10));
        borrowing.id = Some(21);
        borrowing.book_title = Some("Dune".to_string());
        borrowing.returned_date = Some(day(19));

        let fines = vec![
            Fine {
                id: Some(1),
                borrowing: 21,
                amount: 4.5,
                status: FineStatus::Pending,
                days_overdue: Some(9),
                issued_date: Some(day(19)),
                paid_date: None,
                reason: None,
            },
            Fine {
                id: Some(2),
                borrowing: 99,
                amount: 1.0,
                status: FineStatus::Waived,
                days_overdue: None,
                issued_date: None,
                paid_date: None,
                reason: None,
            },
        ];

        let rows = fine_report(&fines, &[borrowing]);
        assert_eq!(rows[0].book, "Dune");
        assert_eq!(rows[0].borrower, "Member #3");
        assert_eq!(rows[1].book, "-");

        let mut out = Vec::new();
        assert_eq!(write_csv(&rows, &mut out).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("fine_id,borrowing_id,book,borrower,due_date,returned_date,days_overdue,amount,status")
        );
        assert_eq!(
            lines.next(),
            Some("1,21,Dune,Member #3,2024-03-10,2024-03-19,9,4.5,pending")
        );
    }

    #[test]
    fn test_overdue_report_skips_on_time() {
        let late = Borrowing::new(1, 1, day(1), day(10));
        let on_time = Borrowing::new(2, 1, day(1), day(25));
        let rows = overdue_report(&[late, on_time], FinePolicy::new(0.5), day(19));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].days_overdue, 9);
        assert_eq!(rows[0].fine_to_date, 4.5);
    }
}
