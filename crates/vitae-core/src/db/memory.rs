//! In-memory link store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AppendOutcome, LinkStore};
use crate::error::{Error, Result};
use crate::models::{LinkId, ShareLink, ViewEvent};

/// `LinkStore` kept in process memory; contents are lost on restart
#[derive(Default)]
pub struct MemoryLinkStore {
    links: RwLock<HashMap<LinkId, ShareLink>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, id: &LinkId) -> Result<Option<ShareLink>> {
        Ok(self.links.read().await.get(id).cloned())
    }

    async fn version(&self, id: &LinkId) -> Result<Option<u64>> {
        Ok(self.links.read().await.get(id).map(|link| link.version))
    }

    async fn create(&self, id: &LinkId) -> Result<ShareLink> {
        let mut links = self.links.write().await;
        if links.contains_key(id) {
            return Err(Error::InvalidInput(format!("Link already exists: {id}")));
        }
        let link = ShareLink::new(id.clone());
        links.insert(id.clone(), link.clone());
        Ok(link)
    }

    async fn append_view(&self, id: &LinkId, event: &ViewEvent) -> Result<AppendOutcome> {
        event.ensure_storable()?;

        let mut links = self.links.write().await;
        let Some(link) = links.get_mut(id) else {
            return Ok(AppendOutcome::Missing);
        };
        link.push_view(event.clone());
        Ok(AppendOutcome::Appended {
            version: link.version,
        })
    }
}
