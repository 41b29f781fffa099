//! Remote resource client
//!
//! Thin wrapper over `reqwest` that builds versioned URLs, attaches the
//! bearer token and normalizes error bodies into [`ClientError`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{ClientError, ClientResult};
use crate::infrastructure::config::Config;
use crate::infrastructure::tokens::{MemoryTokenStore, TokenStore};

const USER_AGENT: &str = concat!("CampusDesk/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to one API root
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_root: String,
    tokens: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.api_root)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        api_root: &str,
        timeout: Duration,
        tokens: Arc<dyn TokenStore>,
    ) -> ClientResult<Self> {
        url::Url::parse(api_root)?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            http,
            api_root: api_root.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn from_config(config: &Config, tokens: Arc<dyn TokenStore>) -> ClientResult<Self> {
        Self::new(
            &config.api_root(),
            Duration::from_secs(config.request_timeout_secs),
            tokens,
        )
    }

    /// Client with an in-memory token store, handy for tests and scripts
    pub fn anonymous(api_root: &str) -> ClientResult<Self> {
        Self::new(
            api_root,
            Duration::from_secs(30),
            Arc::new(MemoryTokenStore::new()),
        )
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// `{root}/{path}/` with exactly one trailing slash
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/", self.api_root)
        } else {
            format!("{}/{}/", self.api_root, path)
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(tokens) = self.tokens.load() {
            req = req.bearer_auth(tokens.access.expose_secret());
        }
        req
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ClientResult<T> {
        let url = self.url(path);
        self.get_url(&url, query).await
    }

    /// GET an absolute URL, used to follow `next`/`previous` links
    pub async fn get_url<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> ClientResult<T> {
        tracing::debug!("GET {}", url);
        let response = self.request(Method::GET, url).query(query).send().await?;
        handle_response(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);
        let response = self.request(Method::DELETE, &url).send().await?;
        let _: Value = handle_response(response).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);
        let response = self.request(method, &url).json(body).send().await?;
        handle_response(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(error_from_body(status, &text));
    }

    // 204 and empty bodies decode as JSON null, which fits `()` and `Value`
    let body = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Map a non-success status and its body to a [`ClientError`].
///
/// Understands `{"detail": ..}`, `{"error"|"message": ..}`,
/// `{"non_field_errors": [..]}` and per-field maps `{"field": ["msg"]}`.
pub fn error_from_body(status: StatusCode, body: &str) -> ClientError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut message: Option<String> = None;

    if let Some(Value::Object(map)) = &parsed {
        for key in ["detail", "error", "message"] {
            if message.is_none()
                && let Some(text) = map.get(key).and_then(value_text)
            {
                message = Some(text);
            }
        }
        for (key, value) in map {
            if matches!(key.as_str(), "detail" | "error" | "message" | "code") {
                continue;
            }
            let messages = value_messages(value);
            if !messages.is_empty() {
                fields.insert(key.clone(), messages);
            }
        }
    } else if let Some(Value::Array(items)) = &parsed {
        let joined: Vec<String> = items.iter().filter_map(value_text).collect();
        if !joined.is_empty() {
            message = Some(joined.join(" "));
        }
    }

    let message = message
        .or_else(|| {
            if fields.is_empty() {
                None
            } else {
                Some(
                    fields
                        .iter()
                        .map(|(field, msgs)| {
                            if field == "non_field_errors" {
                                msgs.join(" ")
                            } else {
                                format!("{}: {}", field, msgs.join(" "))
                            }
                        })
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            }
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() || trimmed.starts_with('<') {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::FORBIDDEN => ClientError::Forbidden(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
            ClientError::Validation { message, fields }
        }
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            if parts.is_empty() { None } else { Some(parts.join(" ")) }
        }
        _ => None,
    }
}

fn value_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        Value::Object(map) => map
            .iter()
            .flat_map(|(k, v)| value_messages(v).into_iter().map(move |m| format!("{}: {}", k, m)))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_has_single_trailing_slash() {
        let client = ApiClient::anonymous("http://localhost:8000/api/v1/").unwrap();
        assert_eq!(
            client.url("/library/books"),
            "http://localhost:8000/api/v1/library/books/"
        );
        assert_eq!(
            client.url("library/books/12/"),
            "http://localhost:8000/api/v1/library/books/12/"
        );
    }

    #[test]
    fn test_invalid_root_is_config_error() {
        let err = ApiClient::anonymous("not a url").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_detail_body() {
        let err = error_from_body(StatusCode::NOT_FOUND, r#"{"detail": "Not found."}"#);
        assert_eq!(err, ClientError::NotFound("Not found.".to_string()));
    }

    #[test]
    fn test_field_errors_body() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"isbn": ["book with this isbn already exists."], "title": ["This field is required."]}"#,
        );
        match err {
            ClientError::Validation { message, fields } => {
                assert_eq!(
                    message,
                    "isbn: book with this isbn already exists.; title: This field is required."
                );
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_non_field_errors_body() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#,
        );
        assert_eq!(
            err.to_string(),
            "Unable to log in with provided credentials."
        );
    }

    #[test]
    fn test_html_body_falls_back_to_reason() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert_eq!(
            err,
            ClientError::Server {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
    }
}
