//! Application state containing the API client and every store

use std::sync::Arc;

use crate::domain::ClientResult;
use crate::infrastructure::client::ApiClient;
use crate::infrastructure::config::Config;
use crate::infrastructure::tokens::{FileTokenStore, TokenStore};
use crate::models::{Customer, Product};
use crate::services::auth_store::AuthStore;
use crate::services::billing_store::BillingStore;
use crate::services::fine_service::FinePolicy;
use crate::services::library_store::LibraryStore;
use crate::services::resource_store::ResourceStore;
use crate::services::school_service::SchoolStore;
use crate::sync::outbox::SyncOutbox;
use crate::sync::product_sync::ProductSync;

/// State shared by every screen / command
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    client: ApiClient,
    auth: Arc<AuthStore>,
    library: Arc<LibraryStore>,
    billing: Arc<BillingStore>,
    school: Arc<SchoolStore>,
    products: Arc<ResourceStore<Product>>,
    customers: Arc<ResourceStore<Customer>>,
    sync: Arc<ProductSync>,
}

impl AppState {
    /// Build the state with tokens persisted in the configured file
    pub fn new(config: Config) -> ClientResult<Self> {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::open(&config.token_file));
        Self::with_tokens(config, tokens)
    }

    pub fn with_tokens(config: Config, tokens: Arc<dyn TokenStore>) -> ClientResult<Self> {
        let client = ApiClient::from_config(&config, tokens)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: ApiClient) -> Self {
        let products = Arc::new(ResourceStore::rest(&client));
        let customers = Arc::new(ResourceStore::rest(&client));

        let outbox = Arc::new(SyncOutbox::new(config.sync_max_attempts));
        let sync = Arc::new(ProductSync::new(
            products.clone(),
            outbox,
            config.product_sync_enabled,
        ));

        let library = Arc::new(LibraryStore::new(
            &client,
            FinePolicy::new(config.fine_per_day),
            Some(sync.clone()),
        ));

        Self {
            auth: Arc::new(AuthStore::new(client.clone())),
            billing: Arc::new(BillingStore::new(&client)),
            school: Arc::new(SchoolStore::new(&client)),
            library,
            products,
            customers,
            sync,
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn library(&self) -> &LibraryStore {
        &self.library
    }

    pub fn billing(&self) -> &BillingStore {
        &self.billing
    }

    pub fn school(&self) -> &SchoolStore {
        &self.school
    }

    pub fn products(&self) -> &Arc<ResourceStore<Product>> {
        &self.products
    }

    pub fn customers(&self) -> &Arc<ResourceStore<Customer>> {
        &self.customers
    }

    pub fn sync(&self) -> &Arc<ProductSync> {
        &self.sync
    }

    /// Log out and drop every cached page
    pub async fn sign_out(&self) -> crate::domain::StoreResult<()> {
        self.auth.logout().await?;
        self.library.reset().await;
        self.billing.reset().await;
        self.school.reset().await;
        self.products.reset().await;
        self.customers.reset().await;
        Ok(())
    }
}
