//! Library -> shop stock mirroring
//!
//! After a book changes, the matching shop product gets its `stock` set to
//! the book's `available_copies`. The mirror is display-only: failures never
//! fail the library operation, they are logged and parked in the outbox.

use std::sync::Arc;

use serde_json::json;
use strsim::jaro_winkler;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::domain::{ClientError, ListParams};
use crate::models::{Book, Product};
use crate::services::resource_store::ResourceStore;
use crate::sync::outbox::{OutboxStatus, StockMirror, SyncOutbox};
use crate::utils::validation::normalize_isbn;

/// Minimum Jaro-Winkler score for a title/name match
pub const NAME_MATCH_THRESHOLD: f64 = 0.92;

const LOOKUP_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Product stock patched
    Updated { product_id: i64 },
    /// Product already had the right stock
    Unchanged { product_id: i64 },
    NoMatch,
    Disabled,
    /// Push failed; parked in the outbox
    Queued { error: String },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RetryReport {
    pub applied: usize,
    pub skipped: usize,
    pub still_pending: usize,
    pub failed: usize,
}

pub struct ProductSync {
    products: Arc<ResourceStore<Product>>,
    outbox: Arc<SyncOutbox>,
    enabled: bool,
}

impl ProductSync {
    pub fn new(products: Arc<ResourceStore<Product>>, outbox: Arc<SyncOutbox>, enabled: bool) -> Self {
        Self {
            products,
            outbox,
            enabled,
        }
    }

    pub fn outbox(&self) -> &Arc<SyncOutbox> {
        &self.outbox
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mirror a book's availability onto its shop product. Never errors.
    pub async fn mirror_book(&self, book: &Book) -> SyncOutcome {
        if !self.enabled {
            return SyncOutcome::Disabled;
        }
        let Some(mirror) = StockMirror::from_book(book) else {
            return SyncOutcome::NoMatch;
        };

        match self.push(&mirror).await {
            Ok(Some(outcome)) => {
                self.outbox.discard_pending_for(mirror.book_id);
                outcome
            }
            Ok(None) => {
                tracing::info!(
                    "No shop product matches book #{} '{}', stock not mirrored",
                    mirror.book_id,
                    mirror.title
                );
                self.outbox.record_skipped(mirror, "no matching product");
                SyncOutcome::NoMatch
            }
            Err(e) => {
                tracing::warn!(
                    "Stock mirror for book #{} failed, queued for retry: {}",
                    mirror.book_id,
                    e
                );
                let error = e.to_string();
                self.outbox.enqueue_failed(mirror, &error);
                SyncOutcome::Queued { error }
            }
        }
    }

    /// Retry every pending outbox entry once, oldest first
    pub async fn retry_pending(&self) -> RetryReport {
        let mut report = RetryReport::default();
        for entry in self.outbox.pending() {
            match self.push(&entry.mirror).await {
                Ok(Some(_)) => {
                    self.outbox.mark_applied(entry.id);
                    report.applied += 1;
                }
                Ok(None) => {
                    self.outbox.mark_skipped(entry.id, "no matching product");
                    report.skipped += 1;
                }
                Err(e) => match self.outbox.mark_attempt_failed(entry.id, &e.to_string()) {
                    OutboxStatus::Failed => {
                        tracing::error!(
                            "Giving up on stock mirror for book #{} after {} attempts: {}",
                            entry.mirror.book_id,
                            self.outbox.max_attempts(),
                            e
                        );
                        report.failed += 1;
                    }
                    _ => report.still_pending += 1,
                },
            }
        }
        report
    }

    /// `Ok(None)` when no product matches
    async fn push(&self, mirror: &StockMirror) -> Result<Option<SyncOutcome>, ClientError> {
        let Some(product) = self.find_product(mirror).await? else {
            return Ok(None);
        };
        let Some(product_id) = product.id else {
            return Ok(None);
        };

        if product.stock == mirror.stock {
            return Ok(Some(SyncOutcome::Unchanged { product_id }));
        }

        let updated = self
            .products
            .api()
            .patch(product_id, &json!({ "stock": mirror.stock }))
            .await?;
        // keep the shop screen's cached page in step
        self.products.replace_cached(updated).await;

        tracing::debug!(
            "Mirrored book #{} stock {} -> product #{}",
            mirror.book_id,
            mirror.stock,
            product_id
        );
        Ok(Some(SyncOutcome::Updated { product_id }))
    }

    /// SKU equal to the ISBN first, then the closest name above the threshold
    async fn find_product(&self, mirror: &StockMirror) -> Result<Option<Product>, ClientError> {
        let api = self.products.api();

        if let Some(isbn) = mirror.isbn.as_deref().filter(|i| !i.trim().is_empty()) {
            let wanted = normalize_isbn(isbn);
            let candidates = api
                .list(&ListParams::new().search(&wanted).page_size(LOOKUP_PAGE_SIZE))
                .await?;
            if let Some(product) = candidates
                .results
                .into_iter()
                .find(|p| p.sku.as_deref().map(normalize_isbn).as_deref() == Some(wanted.as_str()))
            {
                return Ok(Some(product));
            }
        }

        let candidates = api
            .list(
                &ListParams::new()
                    .search(&mirror.title)
                    .page_size(LOOKUP_PAGE_SIZE),
            )
            .await?;
        Ok(best_name_match(&mirror.title, candidates.results))
    }
}

fn best_name_match(title: &str, products: Vec<Product>) -> Option<Product> {
    let wanted = normalize_name(title);
    if wanted.is_empty() {
        return None;
    }
    products
        .into_iter()
        .map(|p| (jaro_winkler(&wanted, &normalize_name(&p.name)), p))
        .filter(|(score, _)| *score >= NAME_MATCH_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, p)| p)
}

/// Accents stripped, case folded, punctuation collapsed to single spaces
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str) -> Product {
        Product {
            id: Some(id),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Les Misérables: Tome 1 "), "les miserables tome 1");
    }

    #[test]
    fn test_best_name_match() {
        let products = vec![
            product(1, "Les Miserables (Tome 1)"),
            product(2, "Les Miserables Tome 2"),
            product(3, "Notebook A5"),
        ];
        let found = best_name_match("Les Misérables - Tome 1", products).unwrap();
        assert_eq!(found.id, Some(1));
    }

    #[test]
    fn test_unrelated_names_do_not_match() {
        let products = vec![product(3, "Notebook A5"), product(4, "Pencil case")];
        assert!(best_name_match("Dune", products).is_none());
    }
}
