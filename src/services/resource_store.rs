//! Paginated collection cache for one REST resource
//!
//! A `ResourceStore<R>` holds the last fetched page of a collection plus
//! loading/error bookkeeping. Fetches replace the page wholesale; mutations
//! call the server first and then patch the cached rows in place, so no
//! refetch is needed after create/update/delete.
//!
//! Every fetch takes a sequence number. When responses arrive out of order
//! only the most recently issued fetch is applied; older ones are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::{
    ClientResult, ListParams, Page, Resource, ResourceApi, StoreError, StoreResult,
    page_number_from_link,
};
use crate::infrastructure::client::ApiClient;
use crate::infrastructure::repositories::RestResourceApi;

/// What happened to a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response replaced the cached page
    Applied,
    /// A newer fetch was issued meanwhile; response dropped
    Stale,
    /// No `next`/`previous` link to follow
    NoPage,
}

/// Read-only copy of a store's state
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<R> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Arc<R>>,
    pub params: ListParams,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
}

impl<R> CollectionSnapshot<R> {
    pub fn current_page(&self) -> u32 {
        self.params.page.unwrap_or(1)
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

struct CollectionState<R> {
    page: Page<Arc<R>>,
    params: ListParams,
    pending: usize,
    loaded: bool,
    error: Option<String>,
}

impl<R> Default for CollectionState<R> {
    fn default() -> Self {
        Self {
            page: Page::default(),
            params: ListParams::default(),
            pending: 0,
            loaded: false,
            error: None,
        }
    }
}

impl<R: Resource> CollectionState<R> {
    fn replace_row(&mut self, id: i64, row: Arc<R>) -> bool {
        match self.page.results.iter_mut().find(|r| r.id() == Some(id)) {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }
}

pub struct ResourceStore<R: Resource> {
    api: Arc<dyn ResourceApi<R>>,
    state: RwLock<CollectionState<R>>,
    fetch_seq: AtomicU64,
}

impl<R: Resource> ResourceStore<R> {
    pub fn new(api: Arc<dyn ResourceApi<R>>) -> Self {
        Self {
            api,
            state: RwLock::new(CollectionState::default()),
            fetch_seq: AtomicU64::new(0),
        }
    }

    /// Store over the resource's REST collection
    pub fn rest(client: &ApiClient) -> Self {
        Self::new(Arc::new(RestResourceApi::<R>::new(client.clone())))
    }

    pub fn api(&self) -> &Arc<dyn ResourceApi<R>> {
        &self.api
    }

    pub fn path(&self) -> &str {
        self.api.path()
    }

    // --- Fetching ---

    /// Load one page with the given search/pagination params
    pub async fn fetch(&self, params: ListParams) -> StoreResult<FetchOutcome> {
        let seq = self.next_seq();
        self.begin().await;
        tracing::debug!("[{}] fetch #{} {:?}", self.path(), seq, params);
        let result = self.api.list(&params).await;
        self.apply_page(seq, params, result).await
    }

    /// Refetch with the params of the last applied fetch
    pub async fn refresh(&self) -> StoreResult<FetchOutcome> {
        let params = self.state.read().await.params.clone();
        self.fetch(params).await
    }

    pub async fn fetch_next(&self) -> StoreResult<FetchOutcome> {
        let link = self.state.read().await.page.next.clone();
        self.follow(link).await
    }

    pub async fn fetch_previous(&self) -> StoreResult<FetchOutcome> {
        let link = self.state.read().await.page.previous.clone();
        self.follow(link).await
    }

    async fn follow(&self, link: Option<String>) -> StoreResult<FetchOutcome> {
        let Some(link) = link else {
            return Ok(FetchOutcome::NoPage);
        };
        let seq = self.next_seq();
        self.begin().await;
        let mut params = self.state.read().await.params.clone();
        params.page = page_number_from_link(&link);
        tracing::debug!("[{}] fetch #{} {}", self.path(), seq, link);
        let result = self.api.list_link(&link).await;
        self.apply_page(seq, params, result).await
    }

    fn next_seq(&self) -> u64 {
        self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn apply_page(
        &self,
        seq: u64,
        params: ListParams,
        result: ClientResult<Page<R>>,
    ) -> StoreResult<FetchOutcome> {
        let mut state = self.state.write().await;
        state.pending = state.pending.saturating_sub(1);

        if seq != self.fetch_seq.load(Ordering::SeqCst) {
            tracing::debug!("[{}] dropping stale response #{}", self.path(), seq);
            return Ok(FetchOutcome::Stale);
        }

        match result {
            Ok(page) => {
                tracing::debug!(
                    "[{}] page loaded: {} of {} rows",
                    self.path(),
                    page.results.len(),
                    page.count
                );
                state.page = page.map(Arc::new);
                state.params = params;
                state.loaded = true;
                state.error = None;
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!("[{}] fetch failed: {}", self.path(), e);
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Walk every page for `params` without touching the cache
    pub async fn collect_all(&self, params: ListParams) -> StoreResult<Vec<R>> {
        let mut page = self.api.list(&params).await?;
        let mut rows = std::mem::take(&mut page.results);
        while let Some(link) = page.next.take() {
            page = self.api.list_link(&link).await?;
            rows.append(&mut page.results);
        }
        Ok(rows)
    }

    // --- Mutations ---

    /// GET one record; refreshes the cached row if it is on the page
    pub async fn retrieve(&self, id: i64) -> StoreResult<Arc<R>> {
        self.begin().await;
        let result = self.api.retrieve(id).await;
        self.finish(result, |state, row| {
            let row = Arc::new(row);
            state.replace_row(id, row.clone());
            row
        })
        .await
    }

    /// POST, then append the server's row and bump `count`
    pub async fn create(&self, item: &R) -> StoreResult<Arc<R>> {
        item.validate()?;
        self.begin().await;
        let result = self.api.create(item).await;
        let created = self
            .finish(result, |state, row| {
                let row = Arc::new(row);
                state.page.results.push(row.clone());
                state.page.count += 1;
                row
            })
            .await?;
        tracing::info!("[{}] created #{:?}", self.path(), created.id());
        Ok(created)
    }

    /// PUT, then swap the cached row for the server's version
    pub async fn update(&self, id: i64, item: &R) -> StoreResult<Arc<R>> {
        item.validate()?;
        self.begin().await;
        let result = self.api.update(id, item).await;
        let updated = self
            .finish(result, |state, row| {
                let row = Arc::new(row);
                state.replace_row(id, row.clone());
                row
            })
            .await?;
        tracing::info!("[{}] updated #{}", self.path(), id);
        Ok(updated)
    }

    /// PATCH selected fields, then swap the cached row
    pub async fn patch(&self, id: i64, changes: Value) -> StoreResult<Arc<R>> {
        self.begin().await;
        let result = self.api.patch(id, &changes).await;
        let updated = self
            .finish(result, |state, row| {
                let row = Arc::new(row);
                state.replace_row(id, row.clone());
                row
            })
            .await?;
        tracing::info!("[{}] patched #{}", self.path(), id);
        Ok(updated)
    }

    /// DELETE, then drop the row and decrement `count`
    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        self.begin().await;
        let result = self.api.delete(id).await;
        self.finish(result, |state, ()| {
            state.page.results.retain(|row| row.id() != Some(id));
            // the server total shrank even if the row was on another page
            state.page.count = state.page.count.saturating_sub(1);
        })
        .await?;
        tracing::info!("[{}] deleted #{}", self.path(), id);
        Ok(())
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.pending += 1;
        state.error = None;
    }

    async fn finish<T, U>(
        &self,
        result: ClientResult<T>,
        apply: impl FnOnce(&mut CollectionState<R>, T) -> U,
    ) -> StoreResult<U> {
        let mut state = self.state.write().await;
        state.pending = state.pending.saturating_sub(1);
        match result {
            Ok(value) => Ok(apply(&mut state, value)),
            Err(e) => {
                tracing::warn!("[{}] request failed: {}", self.path(), e);
                state.error = Some(e.to_string());
                Err(StoreError::Client(e))
            }
        }
    }

    // --- Reads ---

    pub async fn snapshot(&self) -> CollectionSnapshot<R> {
        let state = self.state.read().await;
        CollectionSnapshot {
            count: state.page.count,
            next: state.page.next.clone(),
            previous: state.page.previous.clone(),
            results: state.page.results.clone(),
            params: state.params.clone(),
            loading: state.pending > 0,
            loaded: state.loaded,
            error: state.error.clone(),
        }
    }

    pub async fn results(&self) -> Vec<Arc<R>> {
        self.state.read().await.page.results.clone()
    }

    pub async fn count(&self) -> u64 {
        self.state.read().await.page.count
    }

    pub async fn find(&self, id: i64) -> Option<Arc<R>> {
        self.state
            .read()
            .await
            .page
            .results
            .iter()
            .find(|row| row.id() == Some(id))
            .cloned()
    }

    /// Cached row or a GET when it is not on the current page
    pub async fn get_or_retrieve(&self, id: i64) -> StoreResult<Arc<R>> {
        match self.find(id).await {
            Some(row) => Ok(row),
            None => self.retrieve(id).await,
        }
    }

    /// Swap in a row obtained elsewhere (no request). Ignored when the row
    /// is not on the cached page.
    pub async fn replace_cached(&self, row: R) -> bool {
        let Some(id) = row.id() else {
            return false;
        };
        self.state.write().await.replace_row(id, Arc::new(row))
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.pending > 0
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    /// Forget the cached page, e.g. on logout. In-flight fetches become stale.
    pub async fn reset(&self) {
        self.next_seq();
        let mut state = self.state.write().await;
        let pending = state.pending;
        *state = CollectionState::default();
        state.pending = pending;
    }
}
