use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{char_prefix, iso_or_null};

const CONTENT_PREFIX_CHARS: usize = 50;
const URL_PREFIX_CHARS: usize = 30;

/// A news article scraped from InfoMoney and linked to one stock.
///
/// Rows start out holding only the URL; `title`, `content` and
/// `published_date` are filled in later by the content backfill job.
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfomoneyNews {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub published_date: Option<NaiveDateTime>,
    pub stock_id: Uuid,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted_at: Option<NaiveDateTime>,
}

impl InfomoneyNews {
    /// A fresh, not yet persisted record for `url`.
    pub fn new(stock_id: Uuid, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: None,
            content: None,
            published_date: None,
            stock_id,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "url": self.url,
            "title": self.title,
            "content": self.content,
            "published_date": iso_or_null(self.published_date),
            "stock_id": self.stock_id,
            "created_at": iso_or_null(self.created_at),
            "updated_at": iso_or_null(self.updated_at),
            "deleted_at": iso_or_null(self.deleted_at),
        })
    }

    /// Title when present, else the start of the content, else the start of the URL.
    pub fn label(&self) -> &str {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            return title;
        }
        if let Some(content) = self.content.as_deref().filter(|c| !c.is_empty()) {
            return char_prefix(content, CONTENT_PREFIX_CHARS);
        }
        char_prefix(&self.url, URL_PREFIX_CHARS)
    }
}

impl fmt::Display for InfomoneyNews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<InfomoneyNews {}: {}>", self.id, self.label())
    }
}

/// Article details extracted from a news page.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsContent {
    pub title: Option<String>,
    pub content: String,
    pub published_date: NaiveDateTime,
}
