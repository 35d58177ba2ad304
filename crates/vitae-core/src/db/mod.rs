//! Storage layer for share links

mod connection;
mod link_repository;
mod memory;
mod migrations;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{LinkId, ShareLink, ViewEvent};

pub use connection::Database;
pub use link_repository::LibSqlLinkStore;
pub use memory::MemoryLinkStore;

/// Result of an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The event was stored; `version` is the link's new revision
    Appended { version: u64 },
    /// No link with that ID exists
    Missing,
}

/// Document-style storage for share links
///
/// `append_view` must apply the append, the `last_viewed` update and the
/// version bump as one atomic mutation. Concurrent appends to the same link
/// are all kept, in the order the store accepts them.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Get a link by ID, including its full view history
    async fn get(&self, id: &LinkId) -> Result<Option<ShareLink>>;

    /// Current revision of a link, without loading its views
    async fn version(&self, id: &LinkId) -> Result<Option<u64>>;

    /// Create a link with an empty view history
    async fn create(&self, id: &LinkId) -> Result<ShareLink>;

    /// Append a view to an existing link
    async fn append_view(&self, id: &LinkId, event: &ViewEvent) -> Result<AppendOutcome>;
}
