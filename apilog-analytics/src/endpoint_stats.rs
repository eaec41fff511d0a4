use crate::aggregator::{Aggregation, EndpointAccumulator};
use apilog_core::time::{round2, round6};
use serde::Serialize;

/// Reportable per-endpoint metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub request_count: u64,
    pub avg_response_time_ms: f64,
    pub slowest_request_ms: u64,
    pub fastest_request_ms: u64,
    pub error_count: u64,
    pub error_rate_percentage: f64,
    pub most_common_status: u16,
    pub total_response_time_ms: u64,
    pub total_memory_cost_usd: f64,
    pub get_request_count: u64,
}

impl EndpointStats {
    fn from_accumulator(endpoint: &str, acc: &EndpointAccumulator) -> Self {
        let count = acc.count as f64;
        Self {
            endpoint: endpoint.to_string(),
            request_count: acc.count,
            avg_response_time_ms: round2(acc.total_time_ms as f64 / count),
            slowest_request_ms: acc.max_time_ms.unwrap_or(0),
            fastest_request_ms: acc.min_time_ms.unwrap_or(0),
            error_count: acc.errors,
            error_rate_percentage: round2(acc.errors as f64 / count * 100.0),
            most_common_status: acc.most_common_status(),
            total_response_time_ms: acc.total_time_ms,
            total_memory_cost_usd: round6(acc.memory_cost_usd),
            get_request_count: acc.get_count,
        }
    }

    /// Share of requests that were GETs, in `[0, 1]`.
    pub fn get_ratio(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.get_request_count as f64 / self.request_count as f64
    }
}

/// One entry per endpoint, in first-seen order.
pub fn calculate_endpoint_stats(agg: &Aggregation) -> Vec<EndpointStats> {
    agg.endpoints
        .iter()
        .filter(|(_, acc)| acc.count > 0)
        .map(|(endpoint, acc)| EndpointStats::from_accumulator(endpoint, acc))
        .collect()
}
