//! Library store - books, borrowings and fines
//!
//! Wraps one [`ResourceStore`] per library resource and adds the
//! borrow/return workflow on top: availability bookkeeping, fine
//! assessment and the stock mirror into the shop.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::{StoreError, StoreResult};
use crate::infrastructure::client::ApiClient;
use crate::models::{Author, Book, Borrowing, BorrowingStatus, Category, Fine, FineStatus};
use crate::services::fine_service::FinePolicy;
use crate::services::resource_store::ResourceStore;
use crate::sync::product_sync::{ProductSync, SyncOutcome};

/// Borrow form
#[derive(Debug, Clone)]
pub struct BorrowRequest {
    pub book_id: i64,
    pub borrower_id: i64,
    pub borrowed_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BorrowOutcome {
    pub borrowing: Arc<Borrowing>,
    pub book: Arc<Book>,
    pub sync: SyncOutcome,
}

#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub borrowing: Arc<Borrowing>,
    pub book: Arc<Book>,
    /// Present when the book came back late
    pub fine: Option<Arc<Fine>>,
    pub sync: SyncOutcome,
}

pub struct LibraryStore {
    books: Arc<ResourceStore<Book>>,
    authors: Arc<ResourceStore<Author>>,
    categories: Arc<ResourceStore<Category>>,
    borrowings: Arc<ResourceStore<Borrowing>>,
    fines: Arc<ResourceStore<Fine>>,
    policy: FinePolicy,
    sync: Option<Arc<ProductSync>>,
}

impl LibraryStore {
    pub fn new(client: &ApiClient, policy: FinePolicy, sync: Option<Arc<ProductSync>>) -> Self {
        Self {
            books: Arc::new(ResourceStore::rest(client)),
            authors: Arc::new(ResourceStore::rest(client)),
            categories: Arc::new(ResourceStore::rest(client)),
            borrowings: Arc::new(ResourceStore::rest(client)),
            fines: Arc::new(ResourceStore::rest(client)),
            policy,
            sync,
        }
    }

    pub fn books(&self) -> &Arc<ResourceStore<Book>> {
        &self.books
    }

    pub fn authors(&self) -> &Arc<ResourceStore<Author>> {
        &self.authors
    }

    pub fn categories(&self) -> &Arc<ResourceStore<Category>> {
        &self.categories
    }

    pub fn borrowings(&self) -> &Arc<ResourceStore<Borrowing>> {
        &self.borrowings
    }

    pub fn fines(&self) -> &Arc<ResourceStore<Fine>> {
        &self.fines
    }

    pub fn policy(&self) -> FinePolicy {
        self.policy
    }

    async fn mirror(&self, book: &Book) -> SyncOutcome {
        match &self.sync {
            Some(sync) => sync.mirror_book(book).await,
            None => SyncOutcome::Disabled,
        }
    }

    // --- Books ---

    pub async fn create_book(&self, book: &Book) -> StoreResult<(Arc<Book>, SyncOutcome)> {
        let created = self.books.create(book).await?;
        let sync = self.mirror(&created).await;
        Ok((created, sync))
    }

    pub async fn update_book(&self, id: i64, book: &Book) -> StoreResult<(Arc<Book>, SyncOutcome)> {
        let updated = self.books.update(id, book).await?;
        let sync = self.mirror(&updated).await;
        Ok((updated, sync))
    }

    pub async fn delete_book(&self, id: i64) -> StoreResult<()> {
        self.books.delete(id).await
    }

    // --- Borrowing workflow ---

    /// Lend a copy: create the borrowing, then take one copy off the shelf
    pub async fn borrow_book(&self, request: BorrowRequest) -> StoreResult<BorrowOutcome> {
        let book = self.books.get_or_retrieve(request.book_id).await?;
        if !book.is_available() {
            return Err(StoreError::InvalidState(format!(
                "No copies of '{}' are available",
                book.title
            )));
        }

        let mut borrowing = Borrowing::new(
            request.book_id,
            request.borrower_id,
            request.borrowed_date,
            request.due_date,
        );
        borrowing.notes = request.notes;
        let borrowing = self.borrowings.create(&borrowing).await?;

        let book = self
            .books
            .patch(
                request.book_id,
                json!({ "available_copies": book.available_copies - 1 }),
            )
            .await?;

        tracing::info!(
            "Book #{} lent to #{} until {}",
            request.book_id,
            request.borrower_id,
            request.due_date
        );
        let sync = self.mirror(&book).await;
        Ok(BorrowOutcome {
            borrowing,
            book,
            sync,
        })
    }

    /// Close a borrowing, put the copy back and assess a fine if late
    pub async fn return_book(
        &self,
        borrowing_id: i64,
        returned_date: NaiveDate,
    ) -> StoreResult<ReturnOutcome> {
        let current = self.borrowings.get_or_retrieve(borrowing_id).await?;
        if current.status == BorrowingStatus::Returned || current.returned_date.is_some() {
            return Err(StoreError::InvalidState(
                "Borrowing is already returned".to_string(),
            ));
        }
        if returned_date < current.borrowed_date {
            return Err(StoreError::InvalidState(format!(
                "Return date {} is before the borrow date {}",
                returned_date, current.borrowed_date
            )));
        }

        let borrowing = self
            .borrowings
            .patch(
                borrowing_id,
                json!({ "status": BorrowingStatus::Returned, "returned_date": returned_date }),
            )
            .await?;

        let book = self.books.get_or_retrieve(current.book).await?;
        let available = (book.available_copies + 1).min(book.total_copies);
        let book = self
            .books
            .patch(current.book, json!({ "available_copies": available }))
            .await?;

        let fine = self.assess_fine(&borrowing, returned_date).await?;
        let sync = self.mirror(&book).await;

        Ok(ReturnOutcome {
            borrowing,
            book,
            fine,
            sync,
        })
    }

    /// Persist a pending fine when the borrowing ran late; `None` otherwise
    pub async fn assess_fine(
        &self,
        borrowing: &Borrowing,
        today: NaiveDate,
    ) -> StoreResult<Option<Arc<Fine>>> {
        let Some(borrowing_id) = borrowing.id else {
            return Ok(None);
        };
        let days = self.policy.borrowing_days_overdue(borrowing, today);
        if days == 0 {
            return Ok(None);
        }

        let fine = Fine {
            id: None,
            borrowing: borrowing_id,
            amount: self.policy.borrowing_fine(borrowing, today),
            status: FineStatus::Pending,
            days_overdue: Some(days),
            issued_date: Some(today),
            paid_date: None,
            reason: Some(format!("Returned {} day(s) late", days)),
        };
        let created = self.fines.create(&fine).await?;
        tracing::info!(
            "Fine of {:.2} issued for borrowing #{} ({} days late)",
            created.amount,
            borrowing_id,
            days
        );
        Ok(Some(created))
    }

    /// The copy is gone for good: close the borrowing and shrink the stock
    pub async fn mark_lost(&self, borrowing_id: i64) -> StoreResult<Arc<Borrowing>> {
        let current = self.borrowings.get_or_retrieve(borrowing_id).await?;
        if !current.status.is_open() || current.returned_date.is_some() {
            return Err(StoreError::InvalidState(format!(
                "Only open borrowings can be marked lost (status is {})",
                current.status.as_str()
            )));
        }

        let borrowing = self
            .borrowings
            .patch(borrowing_id, json!({ "status": BorrowingStatus::Lost }))
            .await?;

        let book = self.books.get_or_retrieve(current.book).await?;
        if book.total_copies > 0 {
            self.books
                .patch(
                    current.book,
                    json!({ "total_copies": book.total_copies - 1 }),
                )
                .await?;
        }
        Ok(borrowing)
    }

    // --- Fines ---

    pub async fn pay_fine(&self, fine_id: i64, paid_date: NaiveDate) -> StoreResult<Arc<Fine>> {
        self.ensure_fine_pending(fine_id).await?;
        self.fines
            .patch(
                fine_id,
                json!({ "status": FineStatus::Paid, "paid_date": paid_date }),
            )
            .await
    }

    pub async fn waive_fine(&self, fine_id: i64, reason: &str) -> StoreResult<Arc<Fine>> {
        self.ensure_fine_pending(fine_id).await?;
        self.fines
            .patch(
                fine_id,
                json!({ "status": FineStatus::Waived, "reason": reason }),
            )
            .await
    }

    async fn ensure_fine_pending(&self, fine_id: i64) -> StoreResult<()> {
        let fine = self.fines.get_or_retrieve(fine_id).await?;
        if fine.status != FineStatus::Pending {
            return Err(StoreError::InvalidState(format!(
                "Fine #{} is not pending",
                fine_id
            )));
        }
        Ok(())
    }

    // --- Derived views over the cache ---

    /// Cached borrowings that are overdue on `today`, most overdue first
    pub async fn overdue_borrowings(&self, today: NaiveDate) -> Vec<Arc<Borrowing>> {
        let mut overdue: Vec<Arc<Borrowing>> = self
            .borrowings
            .results()
            .await
            .into_iter()
            .filter(|b| b.is_overdue(today))
            .collect();
        overdue.sort_by_key(|b| b.due_date);
        overdue
    }

    /// Flag cached borrowings past due as overdue, locally only.
    /// Returns how many rows changed.
    pub async fn refresh_overdue_statuses(&self, today: NaiveDate) -> usize {
        let mut changed = 0;
        for row in self.borrowings.results().await {
            if row.status == BorrowingStatus::Borrowed && row.is_overdue(today) {
                let mut flagged = (*row).clone();
                flagged.status = BorrowingStatus::Overdue;
                if self.borrowings.replace_cached(flagged).await {
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            tracing::debug!("{} borrowing(s) now shown as overdue", changed);
        }
        changed
    }

    /// Fine a cached borrowing would carry on `today`
    pub fn fine_preview(&self, borrowing: &Borrowing, today: NaiveDate) -> f64 {
        self.policy.borrowing_fine(borrowing, today)
    }

    /// Sum of pending fines on the cached page
    pub async fn outstanding_fines_total(&self) -> f64 {
        let total: f64 = self
            .fines
            .results()
            .await
            .iter()
            .filter(|f| f.is_outstanding())
            .map(|f| f.amount)
            .sum();
        crate::services::fine_service::round_cents(total)
    }

    /// Forget every cached page, e.g. on logout
    pub async fn reset(&self) {
        self.books.reset().await;
        self.authors.reset().await;
        self.categories.reset().await;
        self.borrowings.reset().await;
        self.fines.reset().await;
    }
}
