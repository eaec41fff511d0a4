//! Latency and error-rate issue detection.

use crate::endpoint_stats::EndpointStats;
use apilog_core::config::{SeverityLadder, ThresholdConfig};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A flagged endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PerformanceIssue {
    SlowEndpoint {
        endpoint: String,
        avg_response_time_ms: f64,
        threshold_ms: u64,
        severity: Severity,
    },
    HighErrorRate {
        endpoint: String,
        error_rate_percentage: f64,
        threshold_percentage: f64,
        severity: Severity,
    },
}

impl PerformanceIssue {
    /// Wire name of the issue type.
    pub fn kind(&self) -> &'static str {
        match self {
            PerformanceIssue::SlowEndpoint { .. } => "slow_endpoint",
            PerformanceIssue::HighErrorRate { .. } => "high_error_rate",
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            PerformanceIssue::SlowEndpoint { endpoint, .. }
            | PerformanceIssue::HighErrorRate { endpoint, .. } => endpoint,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PerformanceIssue::SlowEndpoint { severity, .. }
            | PerformanceIssue::HighErrorRate { severity, .. } => *severity,
        }
    }
}

/// Highest tier whose threshold `value` strictly exceeds, with that threshold.
fn classify<T: Copy>(
    value: f64,
    ladder: &SeverityLadder<T>,
    as_f64: impl Fn(T) -> f64,
) -> Option<(Severity, T)> {
    [
        (Severity::Critical, ladder.critical),
        (Severity::High, ladder.high),
        (Severity::Medium, ladder.medium),
    ]
    .into_iter()
    .find(|&(_, threshold)| value > as_f64(threshold))
}

/// Zero, one, or two issues per endpoint, slow before error-rate.
///
/// Comparisons use the reported (rounded) averages, so an endpoint sitting
/// exactly on a threshold is not flagged at that tier.
pub fn detect_performance_issues(
    stats: &[EndpointStats],
    thresholds: &ThresholdConfig,
) -> Vec<PerformanceIssue> {
    let mut issues = Vec::new();
    for s in stats {
        if let Some((severity, threshold_ms)) =
            classify(s.avg_response_time_ms, &thresholds.latency_ms, |t| t as f64)
        {
            issues.push(PerformanceIssue::SlowEndpoint {
                endpoint: s.endpoint.clone(),
                avg_response_time_ms: s.avg_response_time_ms,
                threshold_ms,
                severity,
            });
        }
        if let Some((severity, threshold_percentage)) =
            classify(s.error_rate_percentage, &thresholds.error_rate_percent, |t| t)
        {
            issues.push(PerformanceIssue::HighErrorRate {
                endpoint: s.endpoint.clone(),
                error_rate_percentage: s.error_rate_percentage,
                threshold_percentage,
                severity,
            });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(endpoint: &str, avg: f64, err_rate: f64) -> EndpointStats {
        EndpointStats {
            endpoint: endpoint.into(),
            request_count: 100,
            avg_response_time_ms: avg,
            slowest_request_ms: 0,
            fastest_request_ms: 0,
            error_count: 0,
            error_rate_percentage: err_rate,
            most_common_status: 200,
            total_response_time_ms: 0,
            total_memory_cost_usd: 0.0,
            get_request_count: 100,
        }
    }

    fn detect(avg: f64, err: f64) -> Vec<PerformanceIssue> {
        detect_performance_issues(&[stats("/x", avg, err)], &ThresholdConfig::default())
    }

    // ── Latency ladder ───────────────────────────────────────────

    #[test]
    fn exact_threshold_is_not_flagged() {
        assert!(detect(500.0, 0.0).is_empty());
        assert!(detect(0.0, 5.0).is_empty());
    }

    #[test]
    fn just_above_threshold_is_medium() {
        let issues = detect(500.01, 0.0);
        assert_eq!(
            issues,
            vec![PerformanceIssue::SlowEndpoint {
                endpoint: "/x".into(),
                avg_response_time_ms: 500.01,
                threshold_ms: 500,
                severity: Severity::Medium,
            }]
        );
    }

    #[test]
    fn latency_tiers() {
        assert_eq!(detect(1000.0, 0.0)[0].severity(), Severity::Medium);
        assert_eq!(detect(1000.5, 0.0)[0].severity(), Severity::High);
        assert_eq!(detect(2000.0, 0.0)[0].severity(), Severity::High);
        assert_eq!(detect(2500.0, 0.0)[0].severity(), Severity::Critical);
    }

    // ── Error-rate ladder ────────────────────────────────────────

    #[test]
    fn error_tiers_report_crossed_threshold() {
        match &detect(0.0, 12.5)[0] {
            PerformanceIssue::HighErrorRate { threshold_percentage, severity, .. } => {
                assert_eq!(*threshold_percentage, 10.0);
                assert_eq!(*severity, Severity::High);
            }
            other => panic!("Expected HighErrorRate, got {other:?}"),
        }
        assert_eq!(detect(0.0, 100.0)[0].severity(), Severity::Critical);
    }

    #[test]
    fn endpoint_can_have_both_issues_slow_first() {
        let issues = detect(2100.0, 20.0);
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], PerformanceIssue::SlowEndpoint { .. }));
        assert!(matches!(issues[1], PerformanceIssue::HighErrorRate { .. }));
        assert_eq!(issues[1].endpoint(), "/x");
    }

    // ── Serialization ────────────────────────────────────────────

    #[test]
    fn issue_serializes_with_type_tag() {
        let json = serde_json::to_value(&detect(0.0, 16.0)[0]).unwrap();
        assert_eq!(json["type"], "high_error_rate");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["threshold_percentage"], 15.0);
    }
}
