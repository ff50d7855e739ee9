use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::iso_or_null;

#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub company: Option<String>,
    pub url: Option<String>,
    pub url_news: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Stock {
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "code": self.code,
            "company": self.company,
            "url": self.url,
            "created_at": iso_or_null(self.created_at),
            "updated_at": iso_or_null(self.updated_at),
            "deleted_at": iso_or_null(self.deleted_at),
        })
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Stock {}: {}>", self.code, self.name)
    }
}

/// A stock ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStock {
    pub name: String,
    pub code: String,
    pub company: Option<String>,
    pub url: Option<String>,
}

/// Loosely typed stock payload, as posted by clients or scraped from the listing.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct StockInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateStocksRequest {
    pub stocks: Option<Vec<StockInput>>,
}
