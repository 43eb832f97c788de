use std::sync::Arc;
use tracing::{info, warn};

use super::listing::{apply, ListingFilter, Reveal, SortKey};
use super::{CatalogItem, CatalogQuery, CatalogSource};
use crate::error::ClientResult;

#[derive(Debug, Clone)]
struct Request {
    query: CatalogQuery,
    append: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// What a catalog screen holds: the fetched items, the local filter/sort and the
/// reveal window. A failed fetch keeps the previous items and can be retried.
///
/// `query` is the last request that succeeded; a request only replaces it once
/// its page has landed.
pub struct CatalogBrowser {
    source: Arc<dyn CatalogSource>,
    items: Vec<CatalogItem>,
    query: CatalogQuery,
    pending: Option<Request>,
    filter: ListingFilter,
    sort: SortKey,
    reveal: Reveal,
    state: LoadState,
    total_pages: Option<u32>,
    has_more: bool,
}

impl CatalogBrowser {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            items: Vec::new(),
            query: CatalogQuery::default(),
            pending: None,
            filter: ListingFilter::default(),
            sort: SortKey::default(),
            reveal: Reveal::default(),
            state: LoadState::Idle,
            total_pages: None,
            has_more: false,
        }
    }

    /// Fresh load; replaces whatever was shown.
    pub async fn load(&mut self, query: CatalogQuery) -> ClientResult<()> {
        self.fetch(Request {
            query,
            append: false,
        })
        .await
    }

    /// Re-runs the request that failed. With nothing pending the current
    /// listing is reloaded from its first page for appending sources.
    pub async fn retry(&mut self) -> ClientResult<()> {
        let request = match self.pending.take() {
            Some(request) => request,
            None => {
                let mut query = self.query.clone();
                if self.source.accumulates_pages() {
                    query.page = 1;
                }
                Request {
                    query,
                    append: false,
                }
            }
        };
        self.fetch(request).await
    }

    pub async fn next_page(&mut self) -> ClientResult<bool> {
        if !self.has_more {
            return Ok(false);
        }
        let mut query = self.query.clone();
        query.page += 1;
        self.fetch(Request {
            query,
            append: self.source.accumulates_pages(),
        })
        .await?;
        Ok(true)
    }

    pub async fn previous_page(&mut self) -> ClientResult<bool> {
        if self.query.page <= 1 || self.source.accumulates_pages() {
            return Ok(false);
        }
        let mut query = self.query.clone();
        query.page -= 1;
        self.fetch(Request {
            query,
            append: false,
        })
        .await?;
        Ok(true)
    }

    async fn fetch(&mut self, request: Request) -> ClientResult<()> {
        self.state = LoadState::Loading;
        let kind = self.source.kind();
        match self.source.fetch(&request.query).await {
            Ok(page) => {
                info!(kind = %kind, page = page.page, "Loaded {} items", page.items.len());
                if request.append {
                    self.items.extend(page.items);
                } else {
                    self.items = page.items;
                    self.reveal.reset();
                }
                self.query = request.query;
                self.pending = None;
                self.total_pages = page.total_pages;
                self.has_more = page.has_more;
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(e) => {
                warn!(kind = %kind, page = request.query.page, "Catalog fetch failed: {}", e);
                self.state = LoadState::Failed(e.to_string());
                self.pending = Some(request);
                Err(e)
            }
        }
    }

    pub fn set_filter(&mut self, filter: ListingFilter) {
        self.filter = filter;
        self.reveal.reset();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.reveal.reset();
    }

    /// Filtered and sorted, before the reveal window.
    pub fn listing(&self) -> Vec<CatalogItem> {
        apply(&self.items, &self.filter, self.sort)
    }

    pub fn visible(&self) -> Vec<CatalogItem> {
        let listing = self.listing();
        self.reveal.slice(&listing).to_vec()
    }

    pub fn load_more(&mut self) -> bool {
        let total = self.listing().len();
        let more = self.reveal.has_more(total);
        self.reveal.load_more(total);
        more
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn page(&self) -> u32 {
        self.query.page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}
