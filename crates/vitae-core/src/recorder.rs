//! View recording service
//!
//! Records "link was viewed" events against existing share links. Each record
//! is an existence lookup followed by a single atomic append in the store, so
//! concurrent views of the same link are never lost and no retry is needed.

use std::sync::Arc;

use crate::db::{AppendOutcome, LinkStore};
use crate::error::{Error, Result};
use crate::models::{LinkId, ShareLink, ViewEvent};

/// Outcome of a successful record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedView {
    /// Link revision after the append
    pub version: u64,
}

/// Appends view events to share links
#[derive(Clone)]
pub struct ViewRecorder {
    store: Arc<dyn LinkStore>,
}

impl ViewRecorder {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Record one view of `link_id`.
    ///
    /// Fails with [`Error::LinkNotFound`] without writing anything when the
    /// link does not exist. Not idempotent: recording the same event twice
    /// stores it twice.
    pub async fn record_view(&self, link_id: &LinkId, event: ViewEvent) -> Result<RecordedView> {
        let seen = self
            .store
            .version(link_id)
            .await?
            .ok_or_else(|| Error::LinkNotFound(link_id.to_string()))?;

        match self.store.append_view(link_id, &event).await? {
            AppendOutcome::Appended { version } => {
                tracing::debug!(link_id = %link_id, seen, version, "Recorded view");
                Ok(RecordedView { version })
            }
            // Removed between lookup and append
            AppendOutcome::Missing => Err(Error::LinkNotFound(link_id.to_string())),
        }
    }

    /// Load a link with its full view history
    pub async fn view_history(&self, link_id: &LinkId) -> Result<ShareLink> {
        self.store
            .get(link_id)
            .await?
            .ok_or_else(|| Error::LinkNotFound(link_id.to_string()))
    }
}
