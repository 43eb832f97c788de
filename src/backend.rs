//! HTTP client for the first-party backend: auth, wishlist and comments.
//!
//! Every response is read as text first so that failures can surface the
//! backend's own `message`. A 2xx body that says `"status": "error"` is still a
//! failure.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{AuthApi, LOGIN_FAILED, REGISTRATION_FAILED};
use crate::comments::{Comment, CommentApi, NewComment};
use crate::config::{http_client, Config};
use crate::error::{ClientError, ClientResult};
use crate::serde_util::list_from_value;
use crate::session::{Session, User};
use crate::wishlist::{NewWishlistEntry, WishlistApi, WishlistEntry};

const USER_ID_HEADER: &str = "userId";

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> ClientResult<Self> {
        Self::new(&config.backend_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let req = self.client.request(method, url);
        match session {
            Some(s) => req
                .bearer_auth(&s.token)
                .header(USER_ID_HEADER, &s.user.id),
            None => req,
        }
    }

    /// Sends and returns the decoded body. `fallback` is the error text used when
    /// the backend gives no `message`.
    async fn send(&self, req: RequestBuilder, fallback: &str) -> ClientResult<Value> {
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(v) => v,
                Err(e) if status.is_success() => {
                    return Err(ClientError::Decode(format!("{fallback}: {e}")));
                }
                Err(_) => Value::Null,
            }
        };
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string();
        if !status.is_success() {
            warn!("Backend answered {}: {}", status, message);
            if status == StatusCode::NOT_FOUND && body.is_null() {
                return Err(ClientError::NotFound(fallback.to_string()));
            }
            return Err(ClientError::Http { status, message });
        }
        match body.get("status").and_then(Value::as_str) {
            Some(s) if !s.eq_ignore_ascii_case("success") => Err(ClientError::Rejected(message)),
            _ => Ok(body),
        }
    }
}

#[async_trait]
impl AuthApi for BackendClient {
    async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let req = self
            .request(Method::POST, "/auth/login", None)
            .json(&json!({ "email": email, "password": password }));
        let body = self.send(req, LOGIN_FAILED).await?;
        if body.get("status").and_then(Value::as_str).is_none() {
            return Err(ClientError::Rejected(LOGIN_FAILED.to_string()));
        }
        let parsed: LoginBody = serde_json::from_value(body)
            .map_err(|e| ClientError::Decode(format!("login response: {e}")))?;
        let (data_token, data_user) = match parsed.data {
            Some(d) => (d.token, d.user),
            None => (None, None),
        };
        let token = parsed
            .token
            .or(data_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::Rejected(LOGIN_FAILED.to_string()))?;
        let user = parsed
            .user
            .or(data_user)
            .ok_or_else(|| ClientError::Decode("login response without user".to_string()))?;
        Ok(Session { token, user })
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> ClientResult<()> {
        let req = self
            .request(Method::POST, "/user/register", None)
            .json(&json!({ "name": name, "email": email, "password": password }));
        let body = self.send(req, REGISTRATION_FAILED).await?;
        if body.get("status").and_then(Value::as_str).is_none() {
            return Err(ClientError::Rejected(REGISTRATION_FAILED.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WishlistApi for BackendClient {
    async fn list(&self, session: &Session) -> ClientResult<Vec<WishlistEntry>> {
        let req = self.request(Method::GET, "/wish-list/get", Some(session));
        let body = self.send(req, "Failed to fetch wishlist").await?;
        Ok(list_from_value(body))
    }

    async fn add(&self, session: &Session, entry: &NewWishlistEntry) -> ClientResult<()> {
        let req = self
            .request(Method::POST, "/wish-list/add", Some(session))
            .json(entry);
        self.send(req, "Failed to add to wishlist").await?;
        Ok(())
    }

    async fn remove(&self, session: &Session, entry_id: &str) -> ClientResult<()> {
        let path = format!("/wish-list/remove/{}", urlencoding::encode(entry_id));
        let req = self.request(Method::DELETE, &path, Some(session));
        self.send(req, "Failed to remove from wishlist").await?;
        Ok(())
    }
}

#[async_trait]
impl CommentApi for BackendClient {
    async fn list_all(&self, session: &Session) -> ClientResult<Vec<Comment>> {
        let req = self.request(Method::GET, "/comments/get", Some(session));
        let body = self.send(req, "Failed to fetch comments").await?;
        Ok(list_from_value(body))
    }

    async fn add(&self, session: &Session, comment: &NewComment) -> ClientResult<()> {
        let req = self
            .request(Method::POST, "/comments/add", Some(session))
            .json(comment);
        self.send(req, "Failed to post comment").await?;
        Ok(())
    }

    async fn delete(&self, session: &Session, comment_id: &str) -> ClientResult<()> {
        let path = format!("/comments/delete/{}", urlencoding::encode(comment_id));
        let req = self.request(Method::DELETE, &path, Some(session));
        self.send(req, "Failed to delete comment").await?;
        Ok(())
    }
}
