//! Share link model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ViewEvent;
use crate::error::{Error, Result};

/// Externally assigned, opaque identifier of a share link
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(String);

impl LinkId {
    /// Wrap an identifier, rejecting blank values
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::InvalidInput("Link ID cannot be empty".into()));
        }
        Ok(Self(value))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LinkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A public share link and its view history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    /// Stable identifier
    pub id: LinkId,
    /// Accepted view events, oldest first
    pub views: Vec<ViewEvent>,
    /// Timestamp of the last accepted view
    pub last_viewed: Option<DateTime<Utc>>,
    /// Revision counter, bumped once per accepted view
    pub version: u64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl ShareLink {
    /// Create a link with an empty view history
    #[must_use]
    pub fn new(id: LinkId) -> Self {
        Self {
            id,
            views: Vec::new(),
            last_viewed: None,
            version: 0,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Number of recorded views
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Append a view, moving `last_viewed` and `version` along with it.
    pub fn push_view(&mut self, event: ViewEvent) {
        self.last_viewed = Some(event.timestamp);
        self.views.push(event);
        self.version += 1;
    }
}
