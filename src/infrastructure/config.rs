use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::fine_service::DEFAULT_FINE_PER_DAY;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub api_version: String,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    pub fine_per_day: f64,
    pub token_file: PathBuf,
    pub product_sync_enabled: bool,
    pub sync_max_attempts: u32,
    pub profile: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            api_version: "v1".to_string(),
            request_timeout_secs: 30,
            page_size: 20,
            fine_per_day: DEFAULT_FINE_PER_DAY,
            token_file: default_token_file("default"),
            product_sync_enabled: true,
            sync_max_attempts: 5,
            profile: "default".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());

        let token_file = env::var("TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_token_file(&profile));

        let fine_per_day = parse_var("FINE_PER_DAY", defaults.fine_per_day);
        let fine_per_day = if fine_per_day.is_finite() && fine_per_day >= 0.0 {
            fine_per_day
        } else {
            tracing::warn!(
                "FINE_PER_DAY must be a non-negative number, using {}",
                defaults.fine_per_day
            );
            defaults.fine_per_day
        };

        Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            api_version: env::var("API_VERSION").unwrap_or(defaults.api_version),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            page_size: parse_var("PAGE_SIZE", defaults.page_size),
            fine_per_day,
            token_file,
            product_sync_enabled: env::var("PRODUCT_SYNC_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            sync_max_attempts: parse_var("SYNC_MAX_ATTEMPTS", defaults.sync_max_attempts),
            profile,
        }
    }

    /// Switch profile; the token file follows unless TOKEN_FILE pins it
    pub fn apply_profile(&mut self, profile: &str) {
        self.profile = profile.to_string();
        if env::var("TOKEN_FILE").is_err() {
            self.token_file = default_token_file(profile);
        }
    }

    /// Root of the versioned API, e.g. `http://localhost:8000/api/v1`
    pub fn api_root(&self) -> String {
        format!(
            "{}/api/{}",
            self.api_base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value '{}' for {}, using {}", raw, key, default);
            default
        }),
        Err(_) => default,
    }
}

/// Token file location per profile
/// On Linux: ~/.cache/campusdesk/tokens.json
/// On macOS: ~/Library/Caches/CampusDesk/tokens.json
/// On Windows: %LOCALAPPDATA%\CampusDesk\tokens.json
fn default_token_file(profile: &str) -> PathBuf {
    let filename = if profile == "default" {
        "tokens.json".to_string()
    } else {
        format!("tokens_{}.json", profile)
    };

    #[cfg(target_os = "macos")]
    let dir = env::var("HOME").map(|home| {
        PathBuf::from(home)
            .join("Library")
            .join("Caches")
            .join("CampusDesk")
    });

    #[cfg(target_os = "windows")]
    let dir = env::var("LOCALAPPDATA").map(|appdata| PathBuf::from(appdata).join("CampusDesk"));

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let dir = env::var("HOME").map(|home| PathBuf::from(home).join(".cache").join("campusdesk"));

    dir.unwrap_or_else(|_| env::temp_dir().join("campusdesk"))
        .join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root_joins_version() {
        let config = Config {
            api_base_url: "https://school.example/".to_string(),
            api_version: "/v2/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.api_root(), "https://school.example/api/v2");
    }

    #[test]
    fn test_profile_token_file_name() {
        assert!(default_token_file("staging").ends_with("tokens_staging.json"));
        assert!(default_token_file("default").ends_with("tokens.json"));
    }
}
