pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod modules;
pub mod services;
pub mod sync;
pub mod utils;

pub use domain::{ClientError, StoreError};
pub use infrastructure::{AppState, Config};
