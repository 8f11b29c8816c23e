use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Timeline document for one city as returned by the provider.
///
/// Only `days` is modelled; every other top-level field, `currentConditions`
/// included, is carried through untouched in `extra` so the document
/// serializes back exactly as received.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherPayload {
    /// Forecast days in provider order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub days: Vec<DayRecord>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<DayRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DayRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

impl WeatherPayload {
    /// `currentConditions` when it is present and an object
    pub fn current_conditions(&self) -> Option<&Map<String, Value>> {
        self.extra.get("currentConditions").and_then(Value::as_object)
    }

    /// Resolved location name reported by the provider, if any
    pub fn resolved_address(&self) -> Option<&str> {
        self.extra.get("resolvedAddress").and_then(Value::as_str)
    }
}

/// One forecast day.
///
/// Numeric accessors return `None` for absent fields and for fields that are
/// present but not numbers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayRecord(Map<String, Value>);

impl DayRecord {
    pub fn number(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn temp(&self) -> Option<f64> {
        self.number("temp")
    }

    pub fn tempmax(&self) -> Option<f64> {
        self.number("tempmax")
    }

    pub fn tempmin(&self) -> Option<f64> {
        self.number("tempmin")
    }

    pub fn precipprob(&self) -> Option<f64> {
        self.number("precipprob")
    }

    /// Forecast date (`YYYY-MM-DD`)
    pub fn datetime(&self) -> Option<&str> {
        self.0.get("datetime").and_then(Value::as_str)
    }
}

/// Weather errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// Provider answered with a non-success status
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Network failure, timeout, or unreadable response
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No day data available")]
    NoData,

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key.
        Self::Transport(e.without_url().to_string())
    }
}
