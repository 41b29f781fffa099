//! Access/refresh token persistence
//!
//! Tokens are kept as [`SecretString`] in memory and only exposed when the
//! `Authorization` header is built or the file is written.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Token file is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// Session tokens issued by the backend
#[derive(Clone, Debug)]
pub struct AuthTokens {
    pub access: SecretString,
    pub refresh: Option<SecretString>,
}

impl AuthTokens {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: SecretString::new(access.into()),
            refresh: refresh.map(SecretString::new),
        }
    }

    /// Claims of the access token, read without checking the signature.
    /// The backend is the one verifying; here they only drive UI state.
    pub fn access_claims(&self) -> Option<TokenClaims> {
        read_claims(self.access.expose_secret())
    }

    /// True while the access token has an `exp` in the future
    pub fn is_access_live(&self, now_ts: i64) -> bool {
        match self.access_claims() {
            Some(claims) => claims.exp.is_none_or(|exp| exp > now_ts),
            None => false,
        }
    }
}

/// Claims the dashboard reads from the access token
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

pub fn read_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

/// On-disk layout, same keys the browser dashboard used in local storage
#[derive(Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Where session tokens live between runs
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<AuthTokens>;
    fn save(&self, tokens: &AuthTokens) -> Result<(), TokenError>;
    fn clear(&self) -> Result<(), TokenError>;
}

/// Process-local token store
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<AuthTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: AuthTokens) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<AuthTokens> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), TokenError> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file token store with an in-memory copy
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<AuthTokens>>,
}

impl FileTokenStore {
    /// Opens the store, reading the file if it already exists.
    /// A corrupt file is logged and treated as logged out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match read_token_file(&path) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!("Ignoring token file {:?}: {}", path, e);
                None
            }
        };
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_token_file(path: &Path) -> Result<Option<AuthTokens>, TokenError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let stored: StoredTokens = serde_json::from_str(&raw)?;
    Ok(Some(AuthTokens::new(
        stored.access_token,
        stored.refresh_token,
    )))
}

/// Owner read/write only on unix
fn write_token_file(path: &Path, contents: &[u8]) -> Result<(), TokenError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        // mode only applies on creation
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        file.write_all(contents)?;
    }
    #[cfg(not(unix))]
    {
        let mut file = options.open(path)?;
        file.write_all(contents)?;
    }
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<AuthTokens> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), TokenError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredTokens {
            access_token: tokens.access.expose_secret().clone(),
            refresh_token: tokens.refresh.as_ref().map(|r| r.expose_secret().clone()),
        };
        write_token_file(&self.path, &serde_json::to_vec_pretty(&stored)?)?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
