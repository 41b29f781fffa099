//! Resource contract, list envelope and query parameters

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ClientResult;
use crate::utils::validation::ValidationErrors;

/// A record exposed by the backend under a REST collection path.
pub trait Resource:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Collection path relative to the versioned API root, e.g. `library/books`
    const PATH: &'static str;

    /// Server-assigned id, `None` for unsaved records
    fn id(&self) -> Option<i64>;

    /// Local checks run before create/update. Nothing by default.
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Implements [`Resource`] for a model with an `id: Option<i64>` field.
/// The `validated` form routes `Resource::validate` to the model's
/// [`Validate`](crate::utils::validation::Validate) impl.
#[macro_export]
macro_rules! impl_resource {
    ($ty:ty, $path:expr) => {
        impl $crate::domain::Resource for $ty {
            const PATH: &'static str = $path;

            fn id(&self) -> Option<i64> {
                self.id
            }
        }
    };
    ($ty:ty, $path:expr, validated) => {
        impl $crate::domain::Resource for $ty {
            const PATH: &'static str = $path;

            fn id(&self) -> Option<i64> {
                self.id
            }

            fn validate(&self) -> Result<(), $crate::utils::validation::ValidationErrors> {
                $crate::utils::validation::Validate::validate(self)
            }
        }
    };
}

/// Paginated list envelope `{count, next, previous, results}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }

    pub fn next_page_number(&self) -> Option<u32> {
        self.next.as_deref().and_then(page_number_from_link)
    }

    pub fn previous_page_number(&self) -> Option<u32> {
        self.previous.as_deref().and_then(page_number_from_link)
    }
}

/// Some endpoints answer with a bare array instead of the envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Paginated(Page<T>),
    Plain(Vec<T>),
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(response: ListResponse<T>) -> Self {
        match response {
            ListResponse::Paginated(page) => page,
            ListResponse::Plain(results) => Page {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}

/// Extract the `page` query parameter of a `next`/`previous` link.
///
/// The first page is usually linked without a `page` parameter, so a link
/// that parses but carries none means page 1.
pub fn page_number_from_link(link: &str) -> Option<u32> {
    let url = Url::parse(link)
        .or_else(|_| Url::parse("http://localhost").and_then(|base| base.join(link)))
        .ok()?;
    let page = url
        .query_pairs()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned());
    match page {
        Some(value) => value.parse().ok(),
        None => Some(1),
    }
}

/// Query parameters for list requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub filters: BTreeMap<String, String>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn ordering(mut self, ordering: impl Into<String>) -> Self {
        self.ordering = Some(ordering.into());
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.insert(key.into(), value.to_string());
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            query.push(("page_size".to_string(), size.to_string()));
        }
        if let Some(search) = &self.search
            && !search.trim().is_empty()
        {
            query.push(("search".to_string(), search.trim().to_string()));
        }
        if let Some(ordering) = &self.ordering
            && !ordering.is_empty()
        {
            query.push(("ordering".to_string(), ordering.clone()));
        }
        for (key, value) in &self.filters {
            query.push((key.clone(), value.clone()));
        }
        query
    }
}

/// Data access contract for one REST collection.
///
/// Implementations live in the infrastructure layer.
#[async_trait::async_trait]
pub trait ResourceApi<R: Resource>: Send + Sync {
    /// Collection path this API talks to
    fn path(&self) -> &str;

    /// GET a page of the collection
    async fn list(&self, params: &ListParams) -> ClientResult<Page<R>>;

    /// GET a page by its absolute `next`/`previous` link
    async fn list_link(&self, link: &str) -> ClientResult<Page<R>>;

    /// GET one record
    async fn retrieve(&self, id: i64) -> ClientResult<R>;

    /// POST a new record
    async fn create(&self, item: &R) -> ClientResult<R>;

    /// PUT a full replacement
    async fn update(&self, id: i64, item: &R) -> ClientResult<R>;

    /// PATCH selected fields
    async fn patch(&self, id: i64, changes: &serde_json::Value) -> ClientResult<R>;

    /// DELETE a record
    async fn delete(&self, id: i64) -> ClientResult<()>;
}
