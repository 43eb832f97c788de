use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::rapidapi::{Endpoint, RapidApiClient};
use super::{CatalogItem, CatalogPage, CatalogQuery, CatalogSource, ContentKind};
use crate::error::{ClientError, ClientResult};
use crate::serde_util::{lenient_i64, string_list, string_or_default, string_or_number};

pub const ANIME_PAGE_SIZE: u32 = 20;
const SORT_FIELDS: [&str; 3] = ["ranking", "title", "episodes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub title: String,
    #[serde(default, alias = "alternativeTitles", deserialize_with = "string_list")]
    pub alternative_titles: Vec<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub ranking: Option<i64>,
    #[serde(default, deserialize_with = "string_list")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub episodes: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default, rename = "type")]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    id: String,
}

/// The anime provider paginates on its side, unlike the top-100 lists.
#[derive(Debug, Clone)]
pub struct AnimeSource {
    client: RapidApiClient,
    endpoint: Endpoint,
}

impl AnimeSource {
    pub fn new(client: RapidApiClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    pub async fn genres(&self) -> ClientResult<Vec<String>> {
        let genres: Vec<Genre> = self
            .client
            .get_json(&self.endpoint, "/genre", "genres")
            .await?;
        let mut ids = genres.into_iter().map(|g| g.id).collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

pub(crate) fn listing_path(query: &CatalogQuery) -> String {
    let mut path = format!("/anime?page={}&size={}", query.page.max(1), ANIME_PAGE_SIZE);
    let mut push = |key: &str, value: Option<&str>| {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            path.push_str(&format!("&{key}={}", urlencoding::encode(v)));
        }
    };
    push("search", query.search.as_deref());
    push("genres", query.genre.as_deref());
    let (field, order) = match &query.sort {
        Some(sort) if SORT_FIELDS.contains(&sort.field.as_str()) => (
            sort.field.as_str(),
            if sort.descending { "desc" } else { "asc" },
        ),
        _ => ("ranking", "asc"),
    };
    push("sortBy", Some(field));
    push("sortOrder", Some(order));
    push("status", query.status.as_deref());
    push("type", query.format.as_deref());
    path
}

/// Bare list = one page; envelope carries `totalPages`/`total` or a `meta` block.
pub(crate) fn page_from_value(value: Value, page: u32) -> ClientResult<CatalogPage> {
    let decode = |v: Value| {
        serde_json::from_value::<Vec<Anime>>(v).map_err(|e| ClientError::Decode(format!("anime: {e}")))
    };
    let (anime, total_pages) = match value {
        Value::Array(_) => (decode(value)?, Some(1)),
        Value::Object(mut map) => {
            let total_pages = total_pages_of(&map);
            match map.remove("data") {
                Some(data @ Value::Array(_)) => (decode(data)?, total_pages),
                _ => (Vec::new(), total_pages),
            }
        }
        _ => (Vec::new(), Some(1)),
    };
    let total_pages = total_pages.map(|t| t.max(1));
    Ok(CatalogPage {
        has_more: total_pages.is_some_and(|t| page < t),
        items: anime.into_iter().map(CatalogItem::Anime).collect(),
        page,
        total_pages,
    })
}

fn total_pages_of(map: &serde_json::Map<String, Value>) -> Option<u32> {
    let number = |v: Option<&Value>| v.and_then(Value::as_u64);
    let meta = map.get("meta");
    if let Some(pages) = number(map.get("totalPages"))
        .or_else(|| number(meta.and_then(|m| m.get("totalPage"))))
        .or_else(|| number(meta.and_then(|m| m.get("totalPages"))))
    {
        return Some(pages as u32);
    }
    number(map.get("total"))
        .or_else(|| number(meta.and_then(|m| m.get("totalData"))))
        .map(|total| total.div_ceil(ANIME_PAGE_SIZE as u64) as u32)
}

#[async_trait]
impl CatalogSource for AnimeSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Anime
    }

    async fn fetch(&self, query: &CatalogQuery) -> ClientResult<CatalogPage> {
        let path = listing_path(query);
        let value: Value = self.client.get_json(&self.endpoint, &path, "anime").await?;
        let page = page_from_value(value, query.page.max(1))?;
        info!(
            "Fetched {} anime (page {} of {:?})",
            page.items.len(),
            page.page,
            page.total_pages
        );
        Ok(page)
    }

    /// Looks the id up as a provider id first, then as a ranking.
    async fn fetch_one(&self, id: &str) -> ClientResult<CatalogItem> {
        let encoded = urlencoding::encode(id);
        let what = format!("anime {id}");
        let by_id = self
            .client
            .get_json::<Anime>(&self.endpoint, &format!("/anime/by-id/{encoded}"), &what)
            .await;
        match by_id {
            Ok(anime) => return Ok(CatalogItem::Anime(anime)),
            Err(ClientError::NotFound(_)) | Err(ClientError::Http { .. }) => {
                debug!("Anime {} not found by id, trying ranking", id);
            }
            Err(e) => return Err(e),
        }
        match self
            .client
            .get_json::<Anime>(&self.endpoint, &format!("/anime/by-ranking/{encoded}"), &what)
            .await
        {
            Ok(anime) => Ok(CatalogItem::Anime(anime)),
            Err(ClientError::NotFound(_)) | Err(ClientError::Http { .. }) => {
                Err(ClientError::NotFound(what))
            }
            Err(e) => Err(e),
        }
    }
}
