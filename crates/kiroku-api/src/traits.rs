//! The catalog interface the rest of the application consumes.
//!
//! Implementations absorb transport and decoding failures: searches degrade
//! to an empty list and lookups to `None`.

use std::future::Future;

use kiroku_core::models::Title;

pub trait CatalogService: Send + Sync {
    /// Free-text title search.
    fn search(&self, query: &str) -> impl Future<Output = Vec<Title>> + Send;

    /// The catalog's most popular TV titles.
    fn popular(&self) -> impl Future<Output = Vec<Title>> + Send;

    /// Fetch one title by catalog id.
    fn get_by_id(&self, id: u64) -> impl Future<Output = Option<Title>> + Send;
}
