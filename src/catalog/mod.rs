//! Third-party catalog access.
//!
//! Each provider has its own adapter that turns the upstream response shape into
//! one [`CatalogItem`] variant. Everything downstream (listing, wishlist, CLI)
//! only sees the uniform accessors.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientResult;
use crate::serde_util::{self, leading_year};

mod anime;
mod browser;
mod listing;
mod movies;
mod music;
mod rapidapi;
mod series;

pub use anime::{Anime, AnimeSource, ANIME_PAGE_SIZE};
pub use browser::{CatalogBrowser, LoadState};
pub use listing::{
    apply, decades_of, genres_of, sort_items, ListingFilter, Pager, Reveal, SortKey, PAGE_SIZE,
    REVEAL_STEP,
};
pub use movies::{Movie, MoviesSource};
pub use music::{format_plays, MusicSource, Track, MUSIC_PAGE_SIZE};
pub use rapidapi::{Endpoint, RapidApiClient};
pub use series::{Series, SeriesSource, SeriesStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
    Music,
    Anime,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Movie,
        ContentKind::Series,
        ContentKind::Music,
        ContentKind::Anime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Series => "series",
            ContentKind::Music => "music",
            ContentKind::Anime => "anime",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(ContentKind::Movie),
            "series" | "tv" | "show" | "shows" => Ok(ContentKind::Series),
            "music" | "song" | "songs" | "track" | "tracks" => Ok(ContentKind::Music),
            "anime" => Ok(ContentKind::Anime),
            other => Err(format!("unknown content kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogItem {
    Movie(Movie),
    Series(Series),
    Music(Track),
    Anime(Anime),
}

impl CatalogItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            CatalogItem::Movie(_) => ContentKind::Movie,
            CatalogItem::Series(_) => ContentKind::Series,
            CatalogItem::Music(_) => ContentKind::Music,
            CatalogItem::Anime(_) => ContentKind::Anime,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.id,
            CatalogItem::Series(s) => &s.id,
            CatalogItem::Music(t) => &t.id,
            CatalogItem::Anime(a) => &a.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.title,
            CatalogItem::Series(s) => &s.title,
            CatalogItem::Music(t) => &t.title,
            CatalogItem::Anime(a) => &a.title,
        }
    }

    pub fn image(&self) -> Option<&str> {
        match self {
            CatalogItem::Movie(m) => m.image.as_deref(),
            CatalogItem::Series(s) => s.image.as_deref(),
            CatalogItem::Music(t) => t.cover.as_deref(),
            CatalogItem::Anime(a) => a.image.as_deref().or(a.thumb.as_deref()),
        }
    }

    pub fn rating(&self) -> Option<f64> {
        match self {
            CatalogItem::Movie(m) => m.rating,
            CatalogItem::Series(s) => s.rating,
            CatalogItem::Music(_) | CatalogItem::Anime(_) => None,
        }
    }

    /// Raw year text as the upstream sent it (`"1994"`, `"2008-2013"`).
    pub fn year_label(&self) -> Option<String> {
        match self {
            CatalogItem::Movie(m) => m.year.clone(),
            CatalogItem::Series(s) => s.year.clone(),
            CatalogItem::Music(t) => t.year.map(|y| y.to_string()),
            CatalogItem::Anime(_) => None,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            CatalogItem::Music(t) => t.year,
            _ => self.year_label().as_deref().and_then(leading_year),
        }
    }

    pub fn genres(&self) -> &[String] {
        match self {
            CatalogItem::Movie(m) => &m.genre,
            CatalogItem::Series(s) => &s.genre,
            CatalogItem::Music(t) => &t.genre,
            CatalogItem::Anime(a) => &a.genres,
        }
    }

    pub fn rank(&self) -> Option<i64> {
        match self {
            CatalogItem::Movie(m) => m.rank,
            CatalogItem::Series(s) => s.rank,
            CatalogItem::Music(_) => None,
            CatalogItem::Anime(a) => a.ranking,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            CatalogItem::Movie(m) => m.description.as_deref(),
            CatalogItem::Series(s) => s.description.as_deref(),
            CatalogItem::Music(t) => t.album.as_deref(),
            CatalogItem::Anime(a) => a.synopsis.as_deref(),
        }
    }
}

impl<'de> Deserialize<'de> for ContentKind {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        serde_util::parsed(d)
    }
}

/// Upstream sort for providers that paginate on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSort {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub page: u32,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub status: Option<String>,
    pub format: Option<String>,
    pub sort: Option<ServerSort>,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            page: 1,
            search: None,
            genre: None,
            status: None,
            format: None,
            sort: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub page: u32,
    pub total_pages: Option<u32>,
    pub has_more: bool,
}

impl CatalogPage {
    /// A complete listing delivered in one response.
    pub fn single(items: Vec<CatalogItem>) -> Self {
        Self {
            items,
            page: 1,
            total_pages: Some(1),
            has_more: false,
        }
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn kind(&self) -> ContentKind;

    async fn fetch(&self, query: &CatalogQuery) -> ClientResult<CatalogPage>;

    async fn fetch_one(&self, id: &str) -> ClientResult<CatalogItem>;

    /// Whether later pages extend the list instead of replacing it.
    fn accumulates_pages(&self) -> bool {
        false
    }
}
