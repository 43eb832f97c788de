use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::rapidapi::{Endpoint, RapidApiClient};
use super::{CatalogItem, CatalogPage, CatalogQuery, CatalogSource, ContentKind};
use crate::error::ClientResult;
use crate::serde_util::{
    lenient_f64, lenient_i64, opt_string_or_number, string_list, string_or_default,
    string_or_number,
};

/// A movie from the top-100 provider, kept as the provider sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub rank: Option<i64>,
    #[serde(default, deserialize_with = "string_or_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub big_image: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub genre: Vec<String>,
    #[serde(default)]
    pub imdbid: Option<String>,
    #[serde(default)]
    pub imdb_link: Option<String>,
    #[serde(default)]
    pub trailer: Option<String>,
}

/// Whole top-100 list in one response; paging happens locally.
#[derive(Debug, Clone)]
pub struct MoviesSource {
    client: RapidApiClient,
    endpoint: Endpoint,
}

impl MoviesSource {
    pub fn new(client: RapidApiClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl CatalogSource for MoviesSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Movie
    }

    async fn fetch(&self, _query: &CatalogQuery) -> ClientResult<CatalogPage> {
        let movies: Vec<Movie> = self.client.get_json(&self.endpoint, "/", "movies").await?;
        info!("Fetched {} movies", movies.len());
        Ok(CatalogPage::single(
            movies.into_iter().map(CatalogItem::Movie).collect(),
        ))
    }

    async fn fetch_one(&self, id: &str) -> ClientResult<CatalogItem> {
        let path = format!("/{}", urlencoding::encode(id));
        let movie: Movie = self
            .client
            .get_json(&self.endpoint, &path, &format!("movie {id}"))
            .await?;
        Ok(CatalogItem::Movie(movie))
    }
}
