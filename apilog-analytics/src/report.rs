use crate::caching::{CachingOpportunity, PotentialSavings};
use crate::cost::CostAnalysis;
use crate::endpoint_stats::EndpointStats;
use crate::performance::PerformanceIssue;
use crate::rate_limit::RateLimitReport;
use crate::summary::{Summary, TopUser};
use apilog_core::config::ReportMode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// The single recommendation of a report built from zero valid records.
pub const NO_LOGS_RECOMMENDATION: &str = "No logs received for analysis.";

/// The full analytics report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: Summary,
    pub endpoint_stats: Vec<EndpointStats>,
    pub performance_issues: Vec<PerformanceIssue>,
    pub recommendations: Vec<String>,
    /// `HH:00` → requests.
    pub hourly_distribution: BTreeMap<String, u64>,
    pub top_users_by_requests: Vec<TopUser>,
    pub cost_analysis: CostAnalysis,
    #[serde(flatten)]
    pub tail: ReportTail,
}

/// Mode-specific tail of the report. Exactly one variant is ever present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportTail {
    RateLimits {
        rate_limit_violations: RateLimitReport,
    },
    Caching {
        caching_opportunities: Vec<CachingOpportunity>,
        total_potential_savings: PotentialSavings,
    },
}

impl ReportTail {
    /// Zero-valued tail for `mode`.
    pub fn empty(mode: ReportMode) -> Self {
        match mode {
            ReportMode::RateLimits => ReportTail::RateLimits {
                rate_limit_violations: RateLimitReport::default(),
            },
            ReportMode::Caching => ReportTail::Caching {
                caching_opportunities: Vec::new(),
                total_potential_savings: PotentialSavings::default(),
            },
        }
    }

    pub fn mode(&self) -> ReportMode {
        match self {
            ReportTail::RateLimits { .. } => ReportMode::RateLimits,
            ReportTail::Caching { .. } => ReportMode::Caching,
        }
    }

    pub fn rate_limits(&self) -> Option<&RateLimitReport> {
        match self {
            ReportTail::RateLimits { rate_limit_violations } => Some(rate_limit_violations),
            ReportTail::Caching { .. } => None,
        }
    }

    pub fn caching(&self) -> Option<(&[CachingOpportunity], &PotentialSavings)> {
        match self {
            ReportTail::Caching {
                caching_opportunities,
                total_potential_savings,
            } => Some((caching_opportunities, total_potential_savings)),
            ReportTail::RateLimits { .. } => None,
        }
    }
}

impl AnalysisReport {
    /// Fixed report for a batch with no valid records.
    pub fn empty(mode: ReportMode, now: DateTime<Utc>) -> Self {
        Self {
            summary: Summary::empty(now),
            endpoint_stats: Vec::new(),
            performance_issues: Vec::new(),
            recommendations: vec![NO_LOGS_RECOMMENDATION.to_string()],
            hourly_distribution: BTreeMap::new(),
            top_users_by_requests: Vec::new(),
            cost_analysis: CostAnalysis::empty(),
            tail: ReportTail::empty(mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apilog_core::time::parse_timestamp;

    fn now() -> DateTime<Utc> {
        parse_timestamp("2025-03-01T08:00:00Z").unwrap()
    }

    #[test]
    fn empty_rate_limit_report_shape() {
        let report = AnalysisReport::empty(ReportMode::RateLimits, now());
        let json = serde_json::to_value(report).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for key in [
            "summary",
            "endpoint_stats",
            "performance_issues",
            "recommendations",
            "hourly_distribution",
            "top_users_by_requests",
            "cost_analysis",
            "rate_limit_violations",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(keys.len(), 8);
        assert_eq!(json["rate_limit_violations"]["total_violations"], 0);
        assert_eq!(json["recommendations"][0], NO_LOGS_RECOMMENDATION);
        assert_eq!(json["summary"]["time_range"]["start"], "2025-03-01T08:00:00Z");
    }

    #[test]
    fn empty_caching_report_has_no_rate_limit_block() {
        let json = serde_json::to_value(AnalysisReport::empty(ReportMode::Caching, now())).unwrap();
        assert!(json.get("rate_limit_violations").is_none());
        assert_eq!(json["caching_opportunities"], serde_json::json!([]));
        assert_eq!(json["total_potential_savings"]["requests_eliminated"], 0);
    }

    #[test]
    fn tail_accessors_match_variant() {
        let tail = ReportTail::empty(ReportMode::Caching);
        assert_eq!(tail.mode(), ReportMode::Caching);
        assert!(tail.rate_limits().is_none());
        assert!(tail.caching().is_some());
    }
}
