use anyhow::{bail, Context, Result};
use reqwest::{Client, Url};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_MOVIES_URL: &str = "https://imdb-top-100-movies.p.rapidapi.com";
pub const DEFAULT_ANIME_URL: &str = "https://anime-db.p.rapidapi.com";
pub const DEFAULT_MUSIC_URL: &str = "https://genius-song-lyrics1.p.rapidapi.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub rapidapi_key: Option<String>,
    pub movies_url: String,
    pub anime_url: String,
    pub music_url: String,
    pub session_file: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend_url = url_setting(
            "ENTERTAINHUB_BACKEND_URL",
            get("ENTERTAINHUB_BACKEND_URL"),
            DEFAULT_BACKEND_URL,
        )?;
        let movies_url = url_setting(
            "ENTERTAINHUB_MOVIES_URL",
            get("ENTERTAINHUB_MOVIES_URL"),
            DEFAULT_MOVIES_URL,
        )?;
        let anime_url = url_setting(
            "ENTERTAINHUB_ANIME_URL",
            get("ENTERTAINHUB_ANIME_URL"),
            DEFAULT_ANIME_URL,
        )?;
        let music_url = url_setting(
            "ENTERTAINHUB_MUSIC_URL",
            get("ENTERTAINHUB_MUSIC_URL"),
            DEFAULT_MUSIC_URL,
        )?;

        let http_timeout = match get("ENTERTAINHUB_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().with_context(|| {
                    format!("ENTERTAINHUB_HTTP_TIMEOUT_SECS must be a whole number, got '{raw}'")
                })?;
                if secs == 0 {
                    bail!("ENTERTAINHUB_HTTP_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let session_file = match get("ENTERTAINHUB_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_session_file()?,
        };

        Ok(Self {
            backend_url,
            rapidapi_key: get("RAPIDAPI_KEY"),
            movies_url,
            anime_url,
            music_url,
            session_file,
            http_timeout,
        })
    }

    /// Catalog commands cannot run without the third-party key.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.rapidapi_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!("Missing required environment variable: RAPIDAPI_KEY"),
        }
    }

    pub fn log_summary(&self) {
        info!(
            backend = %self.backend_url,
            session_file = ?self.session_file,
            catalog_key = self.rapidapi_key.is_some(),
            "Configuration loaded"
        );
    }
}

fn url_setting(key: &str, value: Option<String>, default: &str) -> Result<String> {
    let raw = value.unwrap_or_else(|| default.to_string());
    let parsed = Url::parse(&raw).with_context(|| format!("{key} is not a valid URL: '{raw}'"))?;
    if parsed.host_str().is_none() {
        bail!("{key} must include a host: '{raw}'");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn default_session_file() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("Could not determine a data directory; set ENTERTAINHUB_SESSION_FILE")?;
    Ok(base.join("entertainhub").join("session.json"))
}

/// Shared HTTP client settings for the backend and catalog clients.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    let user_agent = format!("entertainhub/{}", env!("CARGO_PKG_VERSION"));
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::from_lookup(lookup(&[("ENTERTAINHUB_SESSION_FILE", "/tmp/s.json")]))
            .expect("config");
        assert_eq!(cfg.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(cfg.movies_url, DEFAULT_MOVIES_URL);
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert_eq!(cfg.session_file, PathBuf::from("/tmp/s.json"));
        assert!(cfg.rapidapi_key.is_none());
        assert!(cfg.require_api_key().is_err());
    }

    #[test]
    fn overrides_are_trimmed_and_validated() {
        let cfg = Config::from_lookup(lookup(&[
            ("ENTERTAINHUB_BACKEND_URL", "http://127.0.0.1:9000/"),
            ("RAPIDAPI_KEY", " key "),
            ("ENTERTAINHUB_HTTP_TIMEOUT_SECS", "5"),
            ("ENTERTAINHUB_SESSION_FILE", "/tmp/s.json"),
        ]))
        .expect("config");
        assert_eq!(cfg.backend_url, "http://127.0.0.1:9000");
        assert_eq!(cfg.require_api_key().expect("key"), "key");
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));

        assert!(Config::from_lookup(lookup(&[
            ("ENTERTAINHUB_HTTP_TIMEOUT_SECS", "soon"),
            ("ENTERTAINHUB_SESSION_FILE", "/tmp/s.json"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("ENTERTAINHUB_ANIME_URL", "not a url"),
            ("ENTERTAINHUB_SESSION_FILE", "/tmp/s.json"),
        ]))
        .is_err());
    }
}
