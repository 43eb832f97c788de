use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::rapidapi::{Endpoint, RapidApiClient};
use super::{CatalogItem, CatalogPage, CatalogQuery, CatalogSource, ContentKind};
use crate::error::ClientResult;
use crate::serde_util::{
    leading_year, lenient_f64, lenient_i64, opt_string_or_number, string_list, string_or_default,
};

const FEATURED_RANK: i64 = 10;
const NEW_WITHIN_YEARS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStatus {
    Ended,
    Ongoing,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    pub rank: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub big_image: Option<String>,
    pub rating: Option<f64>,
    pub year: Option<String>,
    pub genre: Vec<String>,
    pub imdb_link: Option<String>,
    pub seasons: Option<u32>,
    pub status: Option<SeriesStatus>,
    pub featured: bool,
    pub is_new: bool,
}

#[derive(Debug, Deserialize)]
struct SeriesRecord {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    rank: Option<i64>,
    #[serde(default, deserialize_with = "string_or_default")]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    big_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    rating: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    year: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    genre: Vec<String>,
    #[serde(default)]
    imdb_link: Option<String>,
}

impl SeriesRecord {
    /// `fallback_id` is only consulted when the upstream row carries no id.
    fn into_series(self, fallback_id: impl FnOnce() -> String, current_year: i32) -> Series {
        let span = self.year.as_deref().map(YearSpan::parse).unwrap_or_default();
        let seasons = match (span.start, span.end) {
            (Some(start), Some(end)) => seasons_from_span(start, end),
            _ => None,
        };
        let status = span.status(current_year);
        let is_new = span
            .start
            .is_some_and(|start| start >= current_year - NEW_WITHIN_YEARS);
        Series {
            id: self.id.unwrap_or_else(fallback_id),
            featured: self.rank.is_some_and(|r| r <= FEATURED_RANK),
            rank: self.rank,
            title: self.title,
            description: self.description,
            image: self.image,
            big_image: self.big_image,
            rating: self.rating,
            year: self.year,
            genre: self.genre,
            imdb_link: self.imdb_link,
            seasons,
            status,
            is_new,
        }
    }
}

/// Year text such as `"2008-2013"`, `"2019–"` or `"2021"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct YearSpan {
    start: Option<i32>,
    end: Option<i32>,
    ranged: bool,
}

impl YearSpan {
    fn parse(raw: &str) -> Self {
        let mut parts = raw.split(['-', '–']);
        let start = parts.next().and_then(leading_year);
        let end = parts.next();
        Self {
            start,
            ranged: end.is_some(),
            end: end.and_then(leading_year),
        }
    }

    /// A run without an end year is still airing.
    fn status(&self, current_year: i32) -> Option<SeriesStatus> {
        if self.ranged {
            return Some(match self.end {
                Some(end) if end < current_year => SeriesStatus::Ended,
                _ => SeriesStatus::Ongoing,
            });
        }
        self.start.map(|start| {
            if start < current_year {
                SeriesStatus::Ended
            } else {
                SeriesStatus::Upcoming
            }
        })
    }
}

fn seasons_from_span(start: i32, end: i32) -> Option<u32> {
    if end < start {
        return None;
    }
    let estimate = ((end - start) as f64 / 1.5).ceil() as u32 + 1;
    Some(estimate.max(1))
}

#[derive(Debug, Clone)]
pub struct SeriesSource {
    client: RapidApiClient,
    endpoint: Endpoint,
}

impl SeriesSource {
    pub fn new(client: RapidApiClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl CatalogSource for SeriesSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Series
    }

    async fn fetch(&self, _query: &CatalogQuery) -> ClientResult<CatalogPage> {
        let records: Vec<SeriesRecord> = self
            .client
            .get_json(&self.endpoint, "/series/", "series")
            .await?;
        let current_year = Utc::now().year();
        let items = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                CatalogItem::Series(r.into_series(|| format!("series-{i}"), current_year))
            })
            .collect::<Vec<_>>();
        info!("Fetched {} series", items.len());
        Ok(CatalogPage::single(items))
    }

    async fn fetch_one(&self, id: &str) -> ClientResult<CatalogItem> {
        let path = format!("/series/{}", urlencoding::encode(id));
        let record: SeriesRecord = self
            .client
            .get_json(&self.endpoint, &path, &format!("series {id}"))
            .await?;
        let series = record.into_series(|| id.to_string(), Utc::now().year());
        Ok(CatalogItem::Series(series))
    }
}
