//! Wishlist client state.
//!
//! The backend list is the only source of truth. Every mutation is followed by a
//! full refetch, and the membership index is rebuilt from what came back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{CatalogItem, ContentKind};
use crate::error::{ClientError, ClientResult};
use crate::serde_util::{
    lenient_datetime, lenient_f64, lenient_i64, opt_string_or_number, string_list,
    string_or_default, string_or_number,
};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub user_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub source_id: String,
    #[serde(alias = "type")]
    pub source_type: ContentKind,
    #[serde(default, deserialize_with = "string_or_default")]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub rank: Option<i64>,
    #[serde(default, deserialize_with = "string_list")]
    pub genre: Vec<String>,
    #[serde(default, alias = "createdAt", deserialize_with = "lenient_datetime")]
    pub added_at: Option<DateTime<Utc>>,
}

/// Body of `POST /wish-list/add`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlistEntry {
    pub user_id: String,
    pub source_id: String,
    pub source_type: ContentKind,
    pub title: String,
    pub image: Option<String>,
    pub rating: Option<f64>,
    pub year: Option<String>,
    pub rank: Option<i64>,
    pub genre: Vec<String>,
}

impl NewWishlistEntry {
    pub fn from_item(user_id: &str, item: &CatalogItem) -> Self {
        Self {
            user_id: user_id.to_string(),
            source_id: item.id().to_string(),
            source_type: item.kind(),
            title: item.title().to_string(),
            image: item.image().map(str::to_string),
            rating: item.rating(),
            year: item.year_label(),
            rank: item.rank(),
            genre: item.genres().to_vec(),
        }
    }
}

#[async_trait]
pub trait WishlistApi: Send + Sync {
    async fn list(&self, session: &Session) -> ClientResult<Vec<WishlistEntry>>;

    async fn add(&self, session: &Session, entry: &NewWishlistEntry) -> ClientResult<()>;

    async fn remove(&self, session: &Session, entry_id: &str) -> ClientResult<()>;
}

type Key = (String, ContentKind);

pub struct Wishlist {
    api: Arc<dyn WishlistApi>,
    entries: Vec<WishlistEntry>,
    index: HashMap<Key, usize>,
}

impl Wishlist {
    pub fn new(api: Arc<dyn WishlistApi>) -> Self {
        Self {
            api,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub async fn refresh(&mut self, session: &Session) -> ClientResult<&[WishlistEntry]> {
        let entries = self.api.list(session).await?;
        self.replace(entries);
        Ok(&self.entries)
    }

    fn replace(&mut self, entries: Vec<WishlistEntry>) {
        self.index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.source_id.clone(), e.source_type), i))
            .collect();
        self.entries = entries;
    }

    pub async fn add(&mut self, session: &Session, item: &CatalogItem) -> ClientResult<()> {
        let entry = NewWishlistEntry::from_item(&session.user.id, item);
        self.api.add(session, &entry).await?;
        info!(user_id = %session.user.id, kind = %entry.source_type, "Added {} to wishlist", entry.source_id);
        self.refresh(session).await?;
        Ok(())
    }

    /// Removes by wishlist entry id, not content id.
    pub async fn remove(&mut self, session: &Session, entry_id: &str) -> ClientResult<()> {
        self.api.remove(session, entry_id).await?;
        info!(user_id = %session.user.id, "Removed wishlist entry {}", entry_id);
        self.refresh(session).await?;
        Ok(())
    }

    pub async fn remove_item(
        &mut self,
        session: &Session,
        source_id: &str,
        kind: ContentKind,
    ) -> ClientResult<()> {
        let entry_id = self
            .entry_for(source_id, kind)
            .map(|e| e.id.clone())
            .ok_or(ClientError::NotInWishlist)?;
        self.remove(session, &entry_id).await
    }

    /// Returns whether the item is listed afterwards.
    pub async fn toggle(&mut self, session: &Session, item: &CatalogItem) -> ClientResult<bool> {
        if self.contains(item.id(), item.kind()) {
            self.remove_item(session, item.id(), item.kind()).await?;
        } else {
            self.add(session, item).await?;
        }
        Ok(self.contains(item.id(), item.kind()))
    }

    /// One at a time, stopping at the first failure. The list is refetched either way.
    pub async fn remove_many(&mut self, session: &Session, entry_ids: &[String]) -> ClientResult<usize> {
        let mut removed = 0;
        let mut failure = None;
        for id in entry_ids {
            match self.api.remove(session, id).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!("Stopped bulk removal at {}: {}", id, e);
                    failure = Some(e);
                    break;
                }
            }
        }
        self.refresh(session).await?;
        match failure {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    pub fn contains(&self, source_id: &str, kind: ContentKind) -> bool {
        self.index.contains_key(&(source_id.to_string(), kind))
    }

    pub fn entry_for(&self, source_id: &str, kind: ContentKind) -> Option<&WishlistEntry> {
        self.index
            .get(&(source_id.to_string(), kind))
            .and_then(|&i| self.entries.get(i))
    }

    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WishlistSort {
    #[default]
    Recent,
    Oldest,
    Name,
    Kind,
}

impl FromStr for WishlistSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recent" | "newest" => Ok(WishlistSort::Recent),
            "oldest" => Ok(WishlistSort::Oldest),
            "name" | "title" => Ok(WishlistSort::Name),
            "kind" | "type" => Ok(WishlistSort::Kind),
            other => Err(format!("unknown wishlist sort '{other}'")),
        }
    }
}

impl fmt::Display for WishlistSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WishlistSort::Recent => "recent",
            WishlistSort::Oldest => "oldest",
            WishlistSort::Name => "name",
            WishlistSort::Kind => "kind",
        })
    }
}

pub fn filter_by_kind(entries: &[WishlistEntry], kind: Option<ContentKind>) -> Vec<WishlistEntry> {
    entries
        .iter()
        .filter(|e| kind.map_or(true, |k| e.source_type == k))
        .cloned()
        .collect()
}

/// Entries without a timestamp count as the epoch.
pub fn sort_entries(entries: &mut [WishlistEntry], sort: WishlistSort) {
    let millis = |e: &WishlistEntry| e.added_at.map_or(0, |t| t.timestamp_millis());
    match sort {
        WishlistSort::Recent => entries.sort_by_key(|e| std::cmp::Reverse(millis(e))),
        WishlistSort::Oldest => entries.sort_by_key(millis),
        WishlistSort::Name => entries.sort_by_key(|e| e.title.to_lowercase()),
        WishlistSort::Kind => entries.sort_by_key(|e| e.source_type.as_str()),
    }
}
