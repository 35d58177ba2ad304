//! libSQL-backed link store

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{params, Row, Value};
use std::path::Path;
use tokio::sync::Mutex;

use super::{AppendOutcome, Database, LinkStore};
use crate::error::{Error, Result};
use crate::models::{LinkId, ShareLink, ViewEvent};

/// `LinkStore` over a libSQL `links` table
///
/// Views live in a JSON array column. Appends go through `json_insert` in a
/// single `UPDATE`, so the append, the `last_viewed` update and the version
/// bump commit together or not at all, and concurrent appends never overwrite
/// each other.
pub struct LibSqlLinkStore {
    db: Mutex<Database>,
}

impl LibSqlLinkStore {
    /// Wrap an already opened database
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open (and migrate) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    fn parse_link(row: &Row) -> Result<ShareLink> {
        let id: String = row.get(0)?;
        let views: String = row.get(1)?;
        let last_viewed = match row.get_value(2)? {
            Value::Null => None,
            Value::Text(text) => Some(parse_timestamp(&text)?),
            other => {
                return Err(Error::Database(format!(
                    "Unexpected last_viewed value for link {id}: {other:?}"
                )))
            }
        };

        Ok(ShareLink {
            id: LinkId::new(id)?,
            views: serde_json::from_str(&views)?,
            last_viewed,
            version: to_version(row.get::<i64>(3)?)?,
            created_at: row.get(4)?,
        })
    }
}

#[async_trait]
impl LinkStore for LibSqlLinkStore {
    async fn get(&self, id: &LinkId) -> Result<Option<ShareLink>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, views, last_viewed, version, created_at FROM links WHERE id = ?1",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_link(&row)?)),
            None => Ok(None),
        }
    }

    async fn version(&self, id: &LinkId) -> Result<Option<u64>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT version FROM links WHERE id = ?1", params![id.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(to_version(row.get::<i64>(0)?)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, id: &LinkId) -> Result<ShareLink> {
        let link = ShareLink::new(id.clone());
        let db = self.db.lock().await;

        let inserted = db
            .connection()
            .execute(
                "INSERT OR IGNORE INTO links (id, views, version, created_at)
                 VALUES (?1, '[]', 0, ?2)",
                params![id.as_str(), link.created_at],
            )
            .await?;

        if inserted == 0 {
            return Err(Error::InvalidInput(format!("Link already exists: {id}")));
        }

        Ok(link)
    }

    async fn append_view(&self, id: &LinkId, event: &ViewEvent) -> Result<AppendOutcome> {
        event.ensure_storable()?;
        let payload = serde_json::to_string(event)?;
        let last_viewed = format_timestamp(event.timestamp);

        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "UPDATE links
                 SET views = json_insert(views, '$[#]', json(?1)),
                     last_viewed = ?2,
                     version = version + 1
                 WHERE id = ?3
                 RETURNING version",
                params![payload, last_viewed, id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(AppendOutcome::Appended {
                version: to_version(row.get::<i64>(0)?)?,
            }),
            None => Ok(AppendOutcome::Missing),
        }
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| Error::Database(format!("Invalid stored timestamp `{value}`: {error}")))
}

fn to_version(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::Database(format!("Negative link version: {value}")))
}
