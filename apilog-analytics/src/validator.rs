//! Record validation: presence, numeric coercion, timestamp parsing.
//!
//! A record either validates completely or is rejected with a reason.
//! Nothing is repaired.

use apilog_core::record::{LogRecord, RawRecord, REQUIRED_FIELDS};
use apilog_core::time::parse_timestamp;
use serde_json::Value;
use thiserror::Error;

/// Why a raw record was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` is not an integer")]
    NotAnInteger(&'static str),

    #[error("field `{0}` is negative")]
    Negative(&'static str),

    #[error("field `{0}` is out of range")]
    OutOfRange(&'static str),

    #[error("field `{0}` is not a string")]
    NotAString(&'static str),

    #[error("unparseable timestamp `{0}`")]
    InvalidTimestamp(String),
}

impl RecordError {
    /// Stable label for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            RecordError::MissingField(_) => "missing_field",
            RecordError::NotAnInteger(_) => "not_an_integer",
            RecordError::Negative(_) => "negative",
            RecordError::OutOfRange(_) => "out_of_range",
            RecordError::NotAString(_) => "not_a_string",
            RecordError::InvalidTimestamp(_) => "invalid_timestamp",
        }
    }
}

/// Validate and normalize one raw record.
pub fn validate(raw: &RawRecord) -> Result<LogRecord, RecordError> {
    for field in REQUIRED_FIELDS {
        if !raw.contains_key(field) {
            return Err(RecordError::MissingField(field));
        }
    }

    let response_time_ms = non_negative(raw, "response_time_ms")?;
    let request_size_bytes = non_negative(raw, "request_size_bytes")?;
    let response_size_bytes = non_negative(raw, "response_size_bytes")?;
    let status_code = u16::try_from(non_negative(raw, "status_code")?)
        .map_err(|_| RecordError::OutOfRange("status_code"))?;

    let endpoint = string(raw, "endpoint")?;
    let method = string(raw, "method")?;
    let user_id = string(raw, "user_id")?;

    let raw_ts = raw
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or(RecordError::NotAString("timestamp"))?;
    let timestamp =
        parse_timestamp(raw_ts).ok_or_else(|| RecordError::InvalidTimestamp(raw_ts.to_string()))?;

    Ok(LogRecord {
        timestamp,
        endpoint,
        method,
        status_code,
        user_id,
        request_size_bytes,
        response_size_bytes,
        response_time_ms,
    })
}

/// Integer coercion: ints as-is, floats truncated, base-10 strings parsed.
fn coerce_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i as i128)
            } else if let Some(u) = n.as_u64() {
                Some(u as i128)
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i128)
            }
        }
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

fn non_negative(raw: &RawRecord, field: &'static str) -> Result<u64, RecordError> {
    let value = raw.get(field).ok_or(RecordError::MissingField(field))?;
    let n = coerce_integer(value).ok_or(RecordError::NotAnInteger(field))?;
    if n < 0 {
        return Err(RecordError::Negative(field));
    }
    u64::try_from(n).map_err(|_| RecordError::OutOfRange(field))
}

fn string(raw: &RawRecord, field: &'static str) -> Result<String, RecordError> {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(RecordError::NotAString(field))
}
