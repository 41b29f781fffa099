#![allow(dead_code)]

use std::sync::Arc;

use campusdesk::infrastructure::client::ApiClient;
use campusdesk::infrastructure::tokens::{MemoryTokenStore, TokenStore};
use campusdesk::{AppState, Config};
use serde_json::{Value, json};
use wiremock::MockServer;

/// Config pointing at the mock server
pub fn test_config(server: &MockServer) -> Config {
    Config {
        api_base_url: server.uri(),
        api_version: "v1".to_string(),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

pub fn test_client(server: &MockServer) -> ApiClient {
    ApiClient::anonymous(&format!("{}/api/v1", server.uri())).expect("valid mock uri")
}

pub fn test_state(server: &MockServer) -> AppState {
    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    AppState::with_tokens(test_config(server), tokens).expect("valid mock uri")
}

/// Paginated body in the backend's envelope
pub fn page(count: u64, next: Option<String>, results: Vec<Value>) -> Value {
    json!({
        "count": count,
        "next": next,
        "previous": null,
        "results": results,
    })
}

pub fn book_json(id: i64, title: &str, isbn: Option<&str>, total: u32, available: u32) -> Value {
    json!({
        "id": id,
        "title": title,
        "isbn": isbn,
        "total_copies": total,
        "available_copies": available,
    })
}
