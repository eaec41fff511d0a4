//! The single validation + aggregation pass.

use crate::validator::{self, RecordError};
use apilog_core::config::CostConfig;
use apilog_core::record::{LogRecord, RawRecord};
use apilog_core::time::hour_bucket;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Per-endpoint running totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointAccumulator {
    pub count: u64,
    pub total_time_ms: u64,
    pub min_time_ms: Option<u64>,
    pub max_time_ms: Option<u64>,
    pub errors: u64,
    /// Status code → count, in first-seen order.
    pub statuses: Vec<(u16, u64)>,
    /// Sum of per-record tiered memory cost.
    pub memory_cost_usd: f64,
    pub get_count: u64,
}

impl EndpointAccumulator {
    fn observe(&mut self, record: &LogRecord, memory_cost: f64) {
        let t = record.response_time_ms;
        self.count += 1;
        self.total_time_ms += t;
        self.min_time_ms = Some(self.min_time_ms.map_or(t, |m| m.min(t)));
        self.max_time_ms = Some(self.max_time_ms.map_or(t, |m| m.max(t)));
        match self.statuses.iter_mut().find(|(code, _)| *code == record.status_code) {
            Some((_, n)) => *n += 1,
            None => self.statuses.push((record.status_code, 1)),
        }
        self.memory_cost_usd += memory_cost;
        if record.is_error() {
            self.errors += 1;
        }
        if record.is_get() {
            self.get_count += 1;
        }
    }

    /// Most frequent status; ties go to the status seen first. `0` when empty.
    pub fn most_common_status(&self) -> u16 {
        let mut best: Option<(u16, u64)> = None;
        for &(code, n) in &self.statuses {
            if best.is_none_or(|(_, top)| n > top) {
                best = Some((code, n));
            }
        }
        best.map(|(code, _)| code).unwrap_or(0)
    }
}

/// String-keyed accumulators iterated in first-insertion order.
#[derive(Debug, Clone)]
pub struct Keyed<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T: Default> Keyed<T> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn entry(&mut self, key: &str) -> &mut T {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), T::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Default> Default for Keyed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the pass produces. Owned by one report invocation.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub total_requests: u64,
    pub total_time_ms: u64,
    pub error_count: u64,
    /// `HH:00` → count, sorted by key.
    pub hourly: BTreeMap<String, u64>,
    pub users: Keyed<u64>,
    pub endpoints: Keyed<EndpointAccumulator>,
    /// Validated records, ascending by timestamp.
    pub records: Vec<LogRecord>,
    pub rejected: u64,
    /// Rejection reason → count.
    pub rejections: BTreeMap<&'static str, u64>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.total_requests == 0
    }

    /// Earliest and latest validated instants.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some((first.timestamp, last.timestamp))
    }

    fn accept(&mut self, record: LogRecord, cost: &CostConfig) {
        self.total_requests += 1;
        self.total_time_ms += record.response_time_ms;
        if record.is_error() {
            self.error_count += 1;
        }
        *self.hourly.entry(hour_bucket(&record.timestamp)).or_insert(0) += 1;
        *self.users.entry(&record.user_id) += 1;

        let memory_cost = cost.memory_cost(record.response_size_bytes);
        self.endpoints
            .entry(&record.endpoint)
            .observe(&record, memory_cost);

        self.records.push(record);
    }

    fn reject(&mut self, position: usize, err: &RecordError) {
        debug!(position, reason = err.reason(), error = %err, "Dropping malformed record");
        self.rejected += 1;
        *self.rejections.entry(err.reason()).or_insert(0) += 1;
    }
}

/// Validate and aggregate `raw` in one traversal, then sort the survivors by time.
pub fn aggregate(raw: &[RawRecord], cost: &CostConfig) -> Aggregation {
    let mut agg = Aggregation::default();
    agg.records.reserve(raw.len());

    for (position, entry) in raw.iter().enumerate() {
        match validator::validate(entry) {
            Ok(record) => agg.accept(record, cost),
            Err(err) => agg.reject(position, &err),
        }
    }

    agg.records.sort_by_key(|r| r.timestamp);

    debug!(
        accepted = agg.total_requests,
        rejected = agg.rejected,
        endpoints = agg.endpoints.len(),
        users = agg.users.len(),
        "Aggregation pass complete"
    );
    agg
}
