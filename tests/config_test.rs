use campusdesk::Config;
use serial_test::serial;

const KEYS: [&str; 9] = [
    "PROFILE",
    "API_BASE_URL",
    "API_VERSION",
    "REQUEST_TIMEOUT_SECS",
    "PAGE_SIZE",
    "FINE_PER_DAY",
    "TOKEN_FILE",
    "PRODUCT_SYNC_ENABLED",
    "SYNC_MAX_ATTEMPTS",
];

fn clear_env() {
    for key in KEYS {
        // SAFETY: every test touching the environment is #[serial]
        unsafe { std::env::remove_var(key) };
    }
}

fn set(key: &str, value: &str) {
    // SAFETY: see clear_env
    unsafe { std::env::set_var(key, value) };
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    let config = Config::from_env();

    assert_eq!(config.api_root(), "http://localhost:8000/api/v1");
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.page_size, 20);
    assert_eq!(config.fine_per_day, 0.50);
    assert!(config.product_sync_enabled);
    assert_eq!(config.sync_max_attempts, 5);
    assert_eq!(config.profile, "default");
    assert!(config.token_file.ends_with("tokens.json"));
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    set("API_BASE_URL", "https://school.example/");
    set("API_VERSION", "v2");
    set("FINE_PER_DAY", "1.25");
    set("PRODUCT_SYNC_ENABLED", "false");
    set("PROFILE", "staging");

    let config = Config::from_env();
    clear_env();

    assert_eq!(config.api_root(), "https://school.example/api/v2");
    assert_eq!(config.fine_per_day, 1.25);
    assert!(!config.product_sync_enabled);
    assert!(config.token_file.ends_with("tokens_staging.json"));
}

#[test]
#[serial]
fn test_bad_values_fall_back() {
    clear_env();
    set("PAGE_SIZE", "lots");
    set("FINE_PER_DAY", "-2");

    let config = Config::from_env();
    clear_env();

    assert_eq!(config.page_size, 20);
    assert_eq!(config.fine_per_day, 0.50);
}

#[test]
#[serial]
fn test_profile_switch_respects_pinned_token_file() {
    clear_env();
    let mut config = Config::from_env();
    config.apply_profile("demo");
    assert!(config.token_file.ends_with("tokens_demo.json"));

    set("TOKEN_FILE", "/tmp/campusdesk-pinned.json");
    let mut config = Config::from_env();
    config.apply_profile("demo");
    clear_env();

    assert_eq!(config.profile, "demo");
    assert_eq!(config.token_file.to_str(), Some("/tmp/campusdesk-pinned.json"));
}
