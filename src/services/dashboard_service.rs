//! Dashboard summary
//!
//! Headline numbers for the landing screen. Every source is read
//! concurrently; one failing source fails the whole summary.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{ListParams, StoreResult};
use crate::infrastructure::state::AppState;
use crate::models::{Borrowing, BorrowingStatus, Fine, FineStatus};
use crate::services::fine_service::{FinePolicy, round_cents};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub books: u64,
    pub total_copies: u64,
    pub available_copies: u64,
    pub open_borrowings: usize,
    pub overdue_borrowings: usize,
    /// Pending fines already issued
    pub outstanding_fines: f64,
    /// Fines overdue borrowings would carry if returned today
    pub accruing_fines: f64,
    pub students: u64,
    pub teachers: u64,
    pub classes: u64,
    pub open_invoices: u64,
}

/// Borrowed and overdue lists as one, each id once
pub fn merge_open_borrowings(borrowed: Vec<Borrowing>, overdue: Vec<Borrowing>) -> Vec<Borrowing> {
    let mut seen = HashSet::new();
    borrowed
        .into_iter()
        .chain(overdue)
        .filter(|b| b.id.is_none_or(|id| seen.insert(id)))
        .collect()
}

/// Fold open borrowings into (open, overdue, accruing fines)
fn borrowing_figures(
    borrowings: &[Borrowing],
    policy: FinePolicy,
    today: NaiveDate,
) -> (usize, usize, f64) {
    let open: Vec<&Borrowing> = borrowings
        .iter()
        .filter(|b| b.status.is_open() && b.returned_date.is_none())
        .collect();
    let overdue: Vec<&&Borrowing> = open.iter().filter(|b| b.is_overdue(today)).collect();
    let accruing: f64 = overdue
        .iter()
        .map(|b| policy.borrowing_fine(b, today))
        .sum();
    (open.len(), overdue.len(), round_cents(accruing))
}

fn pending_fines_total(fines: &[Fine]) -> f64 {
    round_cents(
        fines
            .iter()
            .filter(|f| f.status == FineStatus::Pending)
            .map(|f| f.amount)
            .sum(),
    )
}

pub async fn load_summary(state: &AppState, today: NaiveDate) -> StoreResult<DashboardSummary> {
    // only the count matters for these
    let counted = ListParams::new().page_size(1);
    let sent_params = counted.clone().filter("status", "sent");
    let partial_params = counted.clone().filter("status", "partially_paid");
    let overdue_params = counted.clone().filter("status", "overdue");
    let library = state.library();
    let school = state.school();
    let billing = state.billing();

    let (
        books,
        borrowed,
        flagged_overdue,
        fines,
        students,
        teachers,
        classes,
        sent,
        partial,
        overdue_invoices,
    ) = tokio::join!(
        library.books().collect_all(ListParams::new()),
        library.borrowings().collect_all(
            ListParams::new().filter("status", BorrowingStatus::Borrowed.as_str())
        ),
        library.borrowings().collect_all(
            ListParams::new().filter("status", BorrowingStatus::Overdue.as_str())
        ),
        library
            .fines()
            .collect_all(ListParams::new().filter("status", "pending")),
        school.students().api().list(&counted),
        school.teachers().api().list(&counted),
        school.classes().api().list(&counted),
        billing
            .invoices()
            .api()
            .list(&sent_params),
        billing
            .invoices()
            .api()
            .list(&partial_params),
        billing
            .invoices()
            .api()
            .list(&overdue_params),
    );

    let books = books?;
    let borrowings = merge_open_borrowings(borrowed?, flagged_overdue?);
    let fines = fines?;

    let (open_borrowings, overdue_borrowings, accruing_fines) =
        borrowing_figures(&borrowings, state.library().policy(), today);

    let open_invoices = [sent?, partial?, overdue_invoices?]
        .iter()
        .map(|page| page.count)
        .sum();

    let summary = DashboardSummary {
        books: books.len() as u64,
        total_copies: books.iter().map(|b| u64::from(b.total_copies)).sum(),
        available_copies: books.iter().map(|b| u64::from(b.available_copies)).sum(),
        open_borrowings,
        overdue_borrowings,
        outstanding_fines: pending_fines_total(&fines),
        accruing_fines,
        students: students?.count,
        teachers: teachers?.count,
        classes: classes?.count,
        open_invoices,
    };
    tracing::debug!("Dashboard summary: {:?}", summary);
    Ok(summary)
}
