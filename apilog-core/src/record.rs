use crate::error::ApilogError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;

/// One loosely typed log entry as it arrives from an export.
pub type RawRecord = serde_json::Map<String, Value>;

/// Field names every raw record must carry, in validation order.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "timestamp",
    "endpoint",
    "method",
    "response_time_ms",
    "status_code",
    "user_id",
    "request_size_bytes",
    "response_size_bytes",
];

/// A validated access-log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Request instant, UTC.
    #[serde(with = "crate::time::log_format")]
    pub timestamp: DateTime<Utc>,

    /// Logical API route, used as aggregation key
    pub endpoint: String,

    /// HTTP method as logged (case preserved)
    pub method: String,

    pub status_code: u16,

    pub user_id: String,

    pub request_size_bytes: u64,

    pub response_size_bytes: u64,

    pub response_time_ms: u64,
}

impl LogRecord {
    /// 4xx and 5xx count as errors.
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.status_code)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// Parse a JSON array of raw records.
///
/// Elements that are not objects are kept out of the batch and counted in the
/// returned skip total; the top level must be an array.
pub fn read_batch<R: Read>(reader: R) -> Result<(Vec<RawRecord>, u64), ApilogError> {
    let value: Value = serde_json::from_reader(reader)?;
    let Value::Array(items) = value else {
        return Err(ApilogError::InvalidInput(
            "expected a JSON array of log records".into(),
        ));
    };

    let mut skipped = 0;
    let records = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();
    Ok((records, skipped))
}
