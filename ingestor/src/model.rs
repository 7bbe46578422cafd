use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored observation from a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: i64,
    pub device_id: String,
    pub device_name: String,
    pub value: String,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reading payload as supplied by a device.
///
/// Plain values are stored verbatim; structured values (JSON objects and
/// arrays) go through [`ReadingValue::encode`], the single place that
/// decides the stored text form.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    Text(String),
    Structured(serde_json::Value),
}

impl ReadingValue {
    /// Canonical stored text: compact JSON with keys in sorted order for
    /// structured values, the string itself otherwise.
    pub fn encode(&self) -> String {
        match self {
            ReadingValue::Text(text) => text.clone(),
            ReadingValue::Structured(value) => value.to_string(),
        }
    }
}

impl From<serde_json::Value> for ReadingValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => ReadingValue::Text(text),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                ReadingValue::Structured(value)
            }
            scalar => ReadingValue::Text(scalar.to_string()),
        }
    }
}

impl From<&str> for ReadingValue {
    fn from(text: &str) -> Self {
        ReadingValue::Text(text.to_string())
    }
}

impl From<String> for ReadingValue {
    fn from(text: String) -> Self {
        ReadingValue::Text(text)
    }
}

/// Conjunctive filter shared by paged queries and counts. `None` fields
/// impose no constraint; time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingFilter {
    pub device_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReadingFilter {
    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of a database liveness probe. Failures are carried as data.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(rename = "totalRecords", skip_serializing_if = "Option::is_none")]
    pub total_records: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_records: i64,
    pub total_devices: usize,
    pub active_devices: usize,
}
