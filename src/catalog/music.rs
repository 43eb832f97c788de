use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::rapidapi::{Endpoint, RapidApiClient};
use super::{CatalogItem, CatalogPage, CatalogQuery, CatalogSource, ContentKind};
use crate::error::{ClientError, ClientResult};
use crate::serde_util::{lenient_i64, string_or_default, string_or_number};

pub const MUSIC_PAGE_SIZE: u32 = 20;
const DEFAULT_QUERY: &str = "popular";
const EXPLICIT_MARKERS: [&str; 3] = ["explicit", "dirty", "uncensored"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<String>,
    pub year: Option<i32>,
    pub genre: Vec<String>,
    pub plays: String,
    pub explicit: bool,
    pub url: Option<String>,
    pub api_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    response: Option<SearchHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    result: SongResult,
}

#[derive(Debug, Deserialize)]
struct SongResult {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default, deserialize_with = "string_or_default")]
    title: String,
    #[serde(default)]
    artist_names: Option<String>,
    #[serde(default)]
    primary_artist: Option<Named>,
    #[serde(default)]
    album: Option<Named>,
    #[serde(default)]
    song_art_image_url: Option<String>,
    #[serde(default)]
    header_image_url: Option<String>,
    #[serde(default)]
    release_date_components: Option<DateParts>,
    #[serde(default)]
    stats: Option<Stats>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    api_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(default, deserialize_with = "lenient_i64")]
    year: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Stats {
    #[serde(default, deserialize_with = "lenient_i64")]
    pageviews: Option<i64>,
}

impl SearchResponse {
    fn into_hits(self) -> Vec<Hit> {
        match self.response {
            Some(inner) if !inner.hits.is_empty() => inner.hits,
            _ => self.hits,
        }
    }
}

impl From<SongResult> for Track {
    fn from(song: SongResult) -> Self {
        let artist = song
            .artist_names
            .filter(|a| !a.trim().is_empty())
            .or_else(|| song.primary_artist.and_then(|p| p.name))
            .unwrap_or_else(|| "Unknown Artist".to_string());
        let explicit = is_explicit(&song.title, &artist);
        Track {
            id: song.id,
            album: Some(
                song.album
                    .and_then(|a| a.name)
                    .unwrap_or_else(|| "Single".to_string()),
            ),
            cover: song.song_art_image_url.or(song.header_image_url),
            year: song
                .release_date_components
                .and_then(|d| d.year)
                .and_then(|y| i32::try_from(y).ok()),
            genre: Vec::new(),
            plays: format_plays(song.stats.and_then(|s| s.pageviews).unwrap_or(0)),
            explicit,
            url: song.url,
            api_path: song.api_path,
            title: song.title,
            artist,
        }
    }
}

fn is_explicit(title: &str, artist: &str) -> bool {
    let haystack = format!("{title} {artist}").to_lowercase();
    EXPLICIT_MARKERS.iter().any(|m| haystack.contains(m))
}

/// Page views as `1.2M`, `3.4K` or the bare number.
pub fn format_plays(views: i64) -> String {
    match views {
        v if v >= 1_000_000 => format!("{:.1}M", v as f64 / 1_000_000.0),
        v if v >= 1_000 => format!("{:.1}K", v as f64 / 1_000.0),
        v => v.max(0).to_string(),
    }
}

pub(crate) fn search_path(query: &str, per_page: u32, page: u32) -> String {
    format!(
        "/search/?q={}&per_page={}&page={}",
        urlencoding::encode(query),
        per_page,
        page.max(1)
    )
}

/// Song search; pages are appended as the user asks for more.
#[derive(Debug, Clone)]
pub struct MusicSource {
    client: RapidApiClient,
    endpoint: Endpoint,
}

impl MusicSource {
    pub fn new(client: RapidApiClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    async fn search(&self, q: &str, per_page: u32, page: u32) -> ClientResult<Vec<Track>> {
        let path = search_path(q, per_page, page);
        let res: SearchResponse = self.client.get_json(&self.endpoint, &path, "songs").await?;
        Ok(res
            .into_hits()
            .into_iter()
            .map(|h| Track::from(h.result))
            .collect())
    }
}

#[async_trait]
impl CatalogSource for MusicSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Music
    }

    async fn fetch(&self, query: &CatalogQuery) -> ClientResult<CatalogPage> {
        let q = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_QUERY);
        let page = query.page.max(1);
        let tracks = self.search(q, MUSIC_PAGE_SIZE, page).await?;
        info!("Fetched {} songs for '{}' (page {})", tracks.len(), q, page);
        Ok(CatalogPage {
            has_more: tracks.len() == MUSIC_PAGE_SIZE as usize,
            items: tracks.into_iter().map(CatalogItem::Music).collect(),
            page,
            total_pages: None,
        })
    }

    async fn fetch_one(&self, id: &str) -> ClientResult<CatalogItem> {
        let mut tracks = self.search(id, 1, 1).await?;
        if tracks.is_empty() {
            return Err(ClientError::NotFound(format!("song {id}")));
        }
        Ok(CatalogItem::Music(tracks.remove(0)))
    }

    fn accumulates_pages(&self) -> bool {
        true
    }
}
