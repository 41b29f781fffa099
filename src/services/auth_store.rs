//! Auth store - session tokens and the signed-in user
//!
//! Tokens go through the client's [`TokenStore`], so every other store
//! picks up a login or logout on its next request.

use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::domain::{ClientResult, StoreError, StoreResult};
use crate::infrastructure::client::ApiClient;
use crate::infrastructure::tokens::{AuthTokens, TokenError, TokenStore};
use crate::models::{ChangePasswordForm, LoginForm, PasswordResetConfirm, User};
use crate::utils::validation::{Validate, ValidationErrors};

const LOGIN_PATH: &str = "auth/login";
const REFRESH_PATH: &str = "auth/token/refresh";
const LOGOUT_PATH: &str = "auth/logout";
const PROFILE_PATH: &str = "auth/profile";
const CHANGE_PASSWORD_PATH: &str = "auth/change-password";
const PASSWORD_RESET_PATH: &str = "auth/password-reset";
const PASSWORD_RESET_CONFIRM_PATH: &str = "auth/password-reset/confirm";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Only present when the server rotates refresh tokens
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Default)]
struct AuthState {
    user: Option<User>,
    pending: usize,
    error: Option<String>,
}

pub struct AuthStore {
    client: ApiClient,
    state: RwLock<AuthState>,
}

fn storage_error(e: TokenError) -> StoreError {
    StoreError::Storage(e.to_string())
}

impl AuthStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: RwLock::new(AuthState::default()),
        }
    }

    fn tokens(&self) -> &dyn TokenStore {
        self.client.tokens().as_ref()
    }

    /// Runs a request with loading/error bookkeeping
    async fn track<T>(&self, call: impl Future<Output = ClientResult<T>>) -> StoreResult<T> {
        {
            let mut state = self.state.write().await;
            state.pending += 1;
            state.error = None;
        }
        let result = call.await;
        let mut state = self.state.write().await;
        state.pending = state.pending.saturating_sub(1);
        if let Err(e) = &result {
            state.error = Some(e.to_string());
        }
        result.map_err(StoreError::from)
    }

    // --- Session ---

    pub async fn login(&self, form: &LoginForm) -> StoreResult<User> {
        form.validate()?;
        let response: LoginResponse = self.track(self.client.post(LOGIN_PATH, form)).await?;

        self.tokens()
            .save(&AuthTokens::new(response.access, response.refresh))
            .map_err(storage_error)?;

        let user = match response.user {
            Some(user) => user,
            None => self.track(self.client.get(PROFILE_PATH, &[])).await?,
        };
        tracing::info!("Signed in as {}", user.username);
        self.state.write().await.user = Some(user.clone());
        Ok(user)
    }

    /// Trade the refresh token for a new access token
    pub async fn refresh(&self) -> StoreResult<()> {
        let Some(current) = self.tokens().load() else {
            return Err(StoreError::InvalidState("Not signed in".to_string()));
        };
        let Some(refresh) = current.refresh.as_ref() else {
            return Err(StoreError::InvalidState(
                "No refresh token available".to_string(),
            ));
        };
        let refresh = refresh.expose_secret().to_string();

        let response: RefreshResponse = self
            .track(
                self.client
                    .post(REFRESH_PATH, &json!({ "refresh": refresh })),
            )
            .await?;

        let tokens = AuthTokens::new(response.access, Some(response.refresh.unwrap_or(refresh)));
        self.tokens().save(&tokens).map_err(storage_error)?;
        tracing::debug!("Access token refreshed");
        Ok(())
    }

    /// Sign out. Local tokens are dropped even when the server call fails.
    pub async fn logout(&self) -> StoreResult<()> {
        if let Some(tokens) = self.tokens().load() {
            let body = match tokens.refresh.as_ref() {
                Some(refresh) => json!({ "refresh": refresh.expose_secret() }),
                None => json!({}),
            };
            if let Err(e) = self.client.post::<Value, _>(LOGOUT_PATH, &body).await {
                tracing::warn!("Server logout failed, clearing local session anyway: {}", e);
            }
        }

        self.tokens().clear().map_err(storage_error)?;
        let mut state = self.state.write().await;
        state.user = None;
        state.error = None;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Access token present and not expired
    pub fn is_authenticated(&self) -> bool {
        self.tokens()
            .load()
            .is_some_and(|t| t.is_access_live(Utc::now().timestamp()))
    }

    // --- Profile ---

    pub async fn load_profile(&self) -> StoreResult<User> {
        let user: User = self.track(self.client.get(PROFILE_PATH, &[])).await?;
        self.state.write().await.user = Some(user.clone());
        Ok(user)
    }

    pub async fn update_profile(&self, user: &User) -> StoreResult<User> {
        user.validate()?;
        let user: User = self.track(self.client.patch(PROFILE_PATH, user)).await?;
        self.state.write().await.user = Some(user.clone());
        Ok(user)
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    // --- Passwords ---

    pub async fn change_password(&self, form: &ChangePasswordForm) -> StoreResult<()> {
        form.validate()?;
        let _: Value = self
            .track(self.client.post(CHANGE_PASSWORD_PATH, form))
            .await?;
        tracing::info!("Password changed");
        Ok(())
    }

    /// Ask the server to mail a reset link
    pub async fn request_password_reset(&self, email: &str) -> StoreResult<()> {
        let mut errors = ValidationErrors::new();
        errors.require_email("email", email);
        errors.into_result()?;

        let _: Value = self
            .track(
                self.client
                    .post(PASSWORD_RESET_PATH, &json!({ "email": email.trim() })),
            )
            .await?;
        Ok(())
    }

    pub async fn confirm_password_reset(&self, form: &PasswordResetConfirm) -> StoreResult<()> {
        form.validate()?;
        let _: Value = self
            .track(self.client.post(PASSWORD_RESET_CONFIRM_PATH, form))
            .await?;
        Ok(())
    }

    // --- State ---

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.pending > 0
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }
}
