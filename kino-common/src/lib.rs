//! Shared domain types for the kino aggregation service
//!
//! ## Main Components
//! - `Screening` / `ScreeningId`: records and their content-addressed identity
//! - `Filter`: composable predicates used by queries
//! - `Provider`: capability implemented by every scraping source
//! - `Storage`: capability implemented by every screening store

mod error;
pub use error::{AppError, ScrapeError, StorageError};

pub mod filter;
pub use filter::Filter;

mod provider;
pub use provider::Provider;

mod screening;
pub use screening::{Screening, ScreeningId, ScreeningLinks};

mod storage;
pub use storage::Storage;
