//! Infrastructure layer
//!
//! This layer contains:
//! - Configuration loading (config)
//! - HTTP client and error normalization (client)
//! - Token persistence (tokens)
//! - REST implementations of the resource api (repositories)
//! - Application state (state)

pub mod client;
pub mod config;
pub mod repositories;
pub mod state;
pub mod tokens;

pub use client::ApiClient;
pub use config::Config;
pub use repositories::*;
pub use state::AppState;
