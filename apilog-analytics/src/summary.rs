use crate::aggregator::Aggregation;
use apilog_core::time::{format_timestamp, round2};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Global figures for the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_requests: u64,
    pub total_errors: u64,
    pub time_range: TimeRange,
    pub avg_response_time_ms: f64,
    pub error_rate_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopUser {
    pub user_id: String,
    pub request_count: u64,
}

impl Summary {
    /// Zero summary whose range collapses onto `now`.
    pub fn empty(now: DateTime<Utc>) -> Self {
        let stamp = format_timestamp(&now);
        Self {
            total_requests: 0,
            total_errors: 0,
            time_range: TimeRange {
                start: stamp.clone(),
                end: stamp,
            },
            avg_response_time_ms: 0.0,
            error_rate_percentage: 0.0,
        }
    }
}

/// Derive the summary from the pass totals. `now` only matters for an empty pass.
pub fn build_summary(agg: &Aggregation, now: DateTime<Utc>) -> Summary {
    let Some((start, end)) = agg.time_range() else {
        return Summary::empty(now);
    };
    let total = agg.total_requests as f64;
    Summary {
        total_requests: agg.total_requests,
        total_errors: agg.error_count,
        time_range: TimeRange {
            start: format_timestamp(&start),
            end: format_timestamp(&end),
        },
        avg_response_time_ms: round2(agg.total_time_ms as f64 / total),
        error_rate_percentage: round2(agg.error_count as f64 / total * 100.0),
    }
}

/// Top `n` users by request count; equal counts keep first-encounter order.
pub fn top_users(agg: &Aggregation, n: usize) -> Vec<TopUser> {
    let mut users: Vec<(&str, u64)> = agg.users.iter().map(|(id, count)| (id, *count)).collect();
    // Stable sort keeps encounter order among ties.
    users.sort_by(|a, b| b.1.cmp(&a.1));
    users
        .into_iter()
        .take(n)
        .map(|(user_id, request_count)| TopUser {
            user_id: user_id.to_string(),
            request_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use apilog_core::config::CostConfig;
    use apilog_core::record::RawRecord;
    use apilog_core::time::parse_timestamp;
    use serde_json::json;

    fn raw(ts: &str, user: &str, status: u16, time_ms: u64) -> RawRecord {
        json!({
            "timestamp": ts, "endpoint": "/a", "method": "GET",
            "response_time_ms": time_ms, "status_code": status, "user_id": user,
            "request_size_bytes": 1, "response_size_bytes": 1
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn summary_rounds_average_and_error_rate() {
        let logs = vec![
            raw("2025-01-01T10:30:00Z", "u1", 200, 50),
            raw("2025-01-01T10:30:05Z", "u1", 500, 1500),
            raw("2025-01-01T10:30:01Z", "u2", 200, 100),
        ];
        let agg = aggregate(&logs, &CostConfig::default());
        let s = build_summary(&agg, Utc::now());
        assert_eq!(s.total_requests, 3);
        assert_eq!(s.total_errors, 1);
        assert_eq!(s.avg_response_time_ms, 550.0);
        assert_eq!(s.error_rate_percentage, 33.33);
        assert_eq!(s.time_range.start, "2025-01-01T10:30:00Z");
        assert_eq!(s.time_range.end, "2025-01-01T10:30:05Z");
    }

    #[test]
    fn empty_summary_uses_now() {
        let now = parse_timestamp("2025-06-01T12:00:00Z").unwrap();
        let s = build_summary(&Aggregation::default(), now);
        assert_eq!(s.total_requests, 0);
        assert_eq!(s.time_range.start, "2025-06-01T12:00:00Z");
        assert_eq!(s.time_range.end, "2025-06-01T12:00:00Z");
    }

    #[test]
    fn top_users_breaks_ties_by_encounter_order() {
        let logs = vec![
            raw("2025-01-01T10:00:00Z", "carol", 200, 1),
            raw("2025-01-01T10:00:01Z", "alice", 200, 1),
            raw("2025-01-01T10:00:02Z", "bob", 200, 1),
            raw("2025-01-01T10:00:03Z", "bob", 200, 1),
            raw("2025-01-01T10:00:04Z", "dave", 200, 1),
        ];
        let agg = aggregate(&logs, &CostConfig::default());
        let top = top_users(&agg, 3);
        let ids: Vec<&str> = top.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["bob", "carol", "alice"]);
        assert_eq!(top[0].request_count, 2);
    }
}
