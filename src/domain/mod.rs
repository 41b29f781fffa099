//! Domain layer - Pure client abstractions
//!
//! This layer contains NO HTTP client code.
//! Only the resource contract, list envelope and error types.

pub mod errors;
pub mod resource;

pub use errors::{ClientError, ClientResult, StoreError, StoreResult};
pub use resource::*;
