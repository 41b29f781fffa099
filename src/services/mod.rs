//! Services Layer
//!
//! Stores over the REST collections plus the business rules that sit on
//! top of them (borrowing, fines, billing, timetable checks).

pub mod auth_store;
pub mod billing_store;
pub mod dashboard_service;
pub mod fine_service;
pub mod library_store;
pub mod resource_store;
pub mod school_service;

pub use auth_store::AuthStore;
pub use billing_store::BillingStore;
pub use fine_service::FinePolicy;
pub use library_store::LibraryStore;
pub use resource_store::{CollectionSnapshot, FetchOutcome, ResourceStore};
pub use school_service::SchoolStore;
