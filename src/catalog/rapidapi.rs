use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::http_client;
use crate::error::{ClientError, ClientResult};

const HOST_HEADER: &str = "x-rapidapi-host";
const KEY_HEADER: &str = "x-rapidapi-key";

/// A provider base URL plus the host name the gateway expects in its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    host: String,
}

impl Endpoint {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::Decode(format!("invalid provider URL '{base_url}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ClientError::Decode(format!("provider URL '{base_url}' has no host")))?
            .to_string();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

#[derive(Debug, Clone)]
pub struct RapidApiClient {
    client: Client,
    api_key: String,
}

impl RapidApiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.into(),
        })
    }

    /// One GET with the gateway headers. `what` names the resource for error text.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        path_and_query: &str,
        what: &str,
    ) -> ClientResult<T> {
        let url = endpoint.url(path_and_query);
        debug!("GET {}", url);
        let res = self
            .client
            .get(&url)
            .header(HOST_HEADER, endpoint.host())
            .header(KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            warn!("{} -> {} ({} bytes)", url, status, text.len());
            return Err(ClientError::Http {
                status,
                message: format!("Failed to fetch {what}"),
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("{what}: {e}")))
    }
}
