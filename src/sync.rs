//! Cross-module side effects (library stock mirrored into the shop)

pub mod outbox;
pub mod processor;
pub mod product_sync;

pub use outbox::{OutboxEntry, OutboxStatus, StockMirror, SyncOutbox};
pub use product_sync::{ProductSync, RetryReport, SyncOutcome};
