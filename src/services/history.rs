use serde_json::Value;
use tracing::warn;

use crate::models::history::StockHistoryEntry;

/// Parses the quote history payload: a JSON array of rows shaped
/// `[{display, timestamp}, open, close, variation, min, max, volume]`.
///
/// Malformed rows are logged and skipped.
pub fn parse_history(body: &str) -> Result<Vec<StockHistoryEntry>, serde_json::Error> {
    let rows: Vec<Value> = serde_json::from_str(body)?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let entry = parse_row(row);
            if entry.is_none() {
                warn!("Skipping malformed history row: {row}");
            }
            entry
        })
        .collect())
}

fn parse_row(row: &Value) -> Option<StockHistoryEntry> {
    let cells = row.as_array()?;
    if cells.len() < 7 {
        return None;
    }
    let date = cells[0].as_object()?;
    let timestamp = match date.get("timestamp")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    Some(StockHistoryEntry {
        date_display: scalar_text(date.get("display")?)?,
        date_timestamp: timestamp,
        open: scalar_text(&cells[1])?,
        close: scalar_text(&cells[2])?,
        variation: scalar_text(&cells[3])?,
        min_price: scalar_text(&cells[4])?,
        max_price: scalar_text(&cells[5])?,
        volume: scalar_text(&cells[6])?,
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
