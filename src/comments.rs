//! Comments and ratings on a single piece of content.
//!
//! The backend only offers "all comments", so a thread fetches everything and
//! keeps the rows for its own content id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};
use crate::serde_util::{
    id_ref, lenient_datetime, lenient_u8, string_or_default, string_or_number,
};
use crate::session::Session;
use crate::validation::validate_comment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "user", deserialize_with = "id_ref")]
    pub user_id: String,
    #[serde(rename = "movieId", deserialize_with = "id_ref")]
    pub content_id: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub comment: String,
    #[serde(default, deserialize_with = "lenient_u8")]
    pub rating: u8,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /comments/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub user_id: String,
    #[serde(rename = "movieId")]
    pub content_id: String,
    pub comment: String,
    pub rating: u8,
}

#[async_trait]
pub trait CommentApi: Send + Sync {
    async fn list_all(&self, session: &Session) -> ClientResult<Vec<Comment>>;

    async fn add(&self, session: &Session, comment: &NewComment) -> ClientResult<()>;

    async fn delete(&self, session: &Session, comment_id: &str) -> ClientResult<()>;
}

pub struct CommentThread {
    api: Arc<dyn CommentApi>,
    content_id: String,
    comments: Vec<Comment>,
}

impl CommentThread {
    pub fn new(api: Arc<dyn CommentApi>, content_id: impl Into<String>) -> Self {
        Self {
            api,
            content_id: content_id.into(),
            comments: Vec::new(),
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Newest first; undated comments go last.
    pub async fn load(&mut self, session: &Session) -> ClientResult<&[Comment]> {
        let all = self.api.list_all(session).await?;
        let total = all.len();
        let mut mine = all
            .into_iter()
            .filter(|c| c.content_id == self.content_id)
            .collect::<Vec<_>>();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        info!(
            "Loaded {} of {} comments for {}",
            mine.len(),
            total,
            self.content_id
        );
        self.comments = mine;
        Ok(&self.comments)
    }

    pub async fn post(&mut self, session: &Session, text: &str, rating: u8) -> ClientResult<()> {
        validate_comment(text, rating).into_result()?;
        let comment = NewComment {
            user_id: session.user.id.clone(),
            content_id: self.content_id.clone(),
            comment: text.trim().to_string(),
            rating,
        };
        self.api.add(session, &comment).await?;
        info!(user_id = %session.user.id, "Posted comment on {}", self.content_id);
        self.load(session).await?;
        Ok(())
    }

    pub async fn delete(&mut self, session: &Session, comment_id: &str) -> ClientResult<()> {
        self.owned(session, comment_id)?;
        self.api.delete(session, comment_id).await?;
        info!(user_id = %session.user.id, "Deleted comment {}", comment_id);
        self.load(session).await?;
        Ok(())
    }

    /// Changes the local copy only; nothing is sent to the backend.
    pub fn edit(
        &mut self,
        session: &Session,
        comment_id: &str,
        text: &str,
        rating: u8,
    ) -> ClientResult<&Comment> {
        validate_comment(text, rating).into_result()?;
        let idx = self.owned(session, comment_id)?;
        warn!("Comment {} edited locally only", comment_id);
        let comment = &mut self.comments[idx];
        comment.comment = text.trim().to_string();
        comment.rating = rating;
        Ok(&*comment)
    }

    fn owned(&self, session: &Session, comment_id: &str) -> ClientResult<usize> {
        let idx = self
            .comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| ClientError::NotFound(format!("comment {comment_id}")))?;
        if self.comments[idx].user_id != session.user.id {
            return Err(ClientError::NotOwner);
        }
        Ok(idx)
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn average_rating(&self) -> Option<f64> {
        let rated = self
            .comments
            .iter()
            .filter(|c| c.rating > 0)
            .map(|c| f64::from(c.rating))
            .collect::<Vec<_>>();
        if rated.is_empty() {
            return None;
        }
        Some(rated.iter().sum::<f64>() / rated.len() as f64)
    }
}
