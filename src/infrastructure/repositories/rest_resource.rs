//! REST implementation of ResourceApi

use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ClientResult, ListParams, ListResponse, Page, Resource, ResourceApi};
use crate::infrastructure::client::ApiClient;

/// ResourceApi over one collection path of the REST backend
pub struct RestResourceApi<R> {
    client: ApiClient,
    path: String,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Resource> RestResourceApi<R> {
    /// Uses the resource's own collection path
    pub fn new(client: ApiClient) -> Self {
        Self::with_path(client, R::PATH)
    }

    /// Same record shape served from another path (e.g. a scoped endpoint)
    pub fn with_path(client: ApiClient, path: &str) -> Self {
        Self {
            client,
            path: path.trim_matches('/').to_string(),
            _marker: PhantomData,
        }
    }

    fn detail_path(&self, id: i64) -> String {
        format!("{}/{}", self.path, id)
    }
}

#[async_trait]
impl<R: Resource> ResourceApi<R> for RestResourceApi<R> {
    fn path(&self) -> &str {
        &self.path
    }

    async fn list(&self, params: &ListParams) -> ClientResult<Page<R>> {
        let response: ListResponse<R> = self.client.get(&self.path, &params.to_query()).await?;
        Ok(response.into())
    }

    async fn list_link(&self, link: &str) -> ClientResult<Page<R>> {
        let url = if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            // Relative links are resolved against the API host
            let root = url::Url::parse(self.client.api_root())?;
            root.join(link)?.to_string()
        };
        let response: ListResponse<R> = self.client.get_url(&url, &[]).await?;
        Ok(response.into())
    }

    async fn retrieve(&self, id: i64) -> ClientResult<R> {
        self.client.get(&self.detail_path(id), &[]).await
    }

    async fn create(&self, item: &R) -> ClientResult<R> {
        self.client.post(&self.path, item).await
    }

    async fn update(&self, id: i64, item: &R) -> ClientResult<R> {
        self.client.put(&self.detail_path(id), item).await
    }

    async fn patch(&self, id: i64, changes: &Value) -> ClientResult<R> {
        self.client.patch(&self.detail_path(id), changes).await
    }

    async fn delete(&self, id: i64) -> ClientResult<()> {
        self.client.delete(&self.detail_path(id)).await
    }
}
