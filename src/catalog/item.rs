//! Listing and catalog page payloads

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Numeric timestamps below this are seconds, above it milliseconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// A single marketplace listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Numeric item identifier (sent as a number or a numeric string)
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub brand_id: Option<u64>,

    #[serde(default, rename = "brand_title")]
    pub brand: Option<String>,

    #[serde(default)]
    pub price: Option<Value>,

    #[serde(default)]
    pub currency: Option<String>,

    /// The item's own last-update timestamp, as sent by the marketplace
    #[serde(default)]
    pub updated_at_ts: Option<Value>,

    /// Every other field of the raw payload
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogItem {
    /// Parses `updated_at_ts` into a UTC timestamp
    ///
    /// Accepts RFC 3339 text, numeric strings and JSON numbers (seconds or
    /// milliseconds since the epoch). Returns `None` for anything else.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        match self.updated_at_ts.as_ref()? {
            Value::String(text) => parse_timestamp_text(text),
            Value::Number(number) => number.as_i64().and_then(from_epoch),
            _ => None,
        }
    }

    /// Price rendered as text, whether the API sent a string, a number, or an
    /// `{ amount, currency_code }` object
    pub fn price_text(&self) -> Option<String> {
        match self.price.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(obj) => obj.get("amount").and_then(|amount| match amount {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            _ => None,
        }
    }
}

/// Response body of the single-item endpoint
#[derive(Debug, Deserialize)]
pub struct ItemEnvelope {
    pub item: CatalogItem,
}

/// Response body of the catalog listing endpoint
#[derive(Debug, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub items: Vec<Value>,
}

impl CatalogPage {
    /// Highest item ID in the page, ignoring entries without a usable ID
    pub fn max_id(&self) -> Option<u64> {
        self.items
            .iter()
            .filter_map(|item| item.get("id").and_then(id_from_value))
            .filter(|id| *id > 0)
            .max()
    }
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    text.trim().parse::<i64>().ok().and_then(from_epoch)
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() < MILLIS_THRESHOLD {
        Utc.timestamp_opt(value, 0).single()
    } else {
        Utc.timestamp_millis_opt(value).single()
    }
}

fn id_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| de::Error::custom(format!("invalid item id: {}", value)))
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}
