use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::iso_or_null;

/// One trading day of a stock, stored as the provider formats it.
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStockData {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub trading_date: NaiveDateTime,
    pub variation: String,
    pub open_price: String,
    pub close_price: String,
    pub min_price: String,
    pub max_price: String,
    pub volume: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted_at: Option<NaiveDateTime>,
}

impl HistoricalStockData {
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "stock_id": self.stock_id,
            "trading_date": iso_or_null(Some(self.trading_date)),
            "variation": self.variation,
            "open_price": self.open_price,
            "close_price": self.close_price,
            "min_price": self.min_price,
            "max_price": self.max_price,
            "volume": self.volume,
            "created_at": iso_or_null(self.created_at),
            "updated_at": iso_or_null(self.updated_at),
        })
    }
}

/// Row of the provider's quote history table.
#[derive(Debug, Clone, PartialEq)]
pub struct StockHistoryEntry {
    pub date_display: String,
    pub date_timestamp: i64,
    pub open: String,
    pub close: String,
    pub variation: String,
    pub min_price: String,
    pub max_price: String,
    pub volume: String,
}

impl StockHistoryEntry {
    pub fn trading_date(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp(self.date_timestamp, 0).map(|dt| dt.naive_utc())
    }

    pub fn into_new_entry(self, stock_id: Uuid) -> Option<NewHistoricalEntry> {
        let trading_date = self.trading_date()?;
        Some(NewHistoricalEntry {
            stock_id,
            trading_date,
            variation: self.variation,
            open_price: self.open,
            close_price: self.close,
            min_price: self.min_price,
            max_price: self.max_price,
            volume: self.volume,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoricalEntry {
    pub stock_id: Uuid,
    pub trading_date: NaiveDateTime,
    pub variation: String,
    pub open_price: String,
    pub close_price: String,
    pub min_price: String,
    pub max_price: String,
    pub volume: String,
}
