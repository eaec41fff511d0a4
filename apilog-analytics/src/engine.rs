//! Report assembly: one aggregation pass, then every derived section.

use crate::aggregator::{aggregate, Aggregation};
use crate::caching::analyze_caching_opportunities;
use crate::cost::estimate_costs;
use crate::endpoint_stats::calculate_endpoint_stats;
use crate::performance::detect_performance_issues;
use crate::rate_limit::analyze_rate_limits;
use crate::recommendations::generate_recommendations;
use crate::report::{AnalysisReport, ReportTail};
use crate::summary::{build_summary, top_users};
use apilog_core::config::{AnalyzerConfig, ReportMode};
use apilog_core::error::ApilogError;
use apilog_core::record::RawRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters describing one run, kept out of the report itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub seen: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub rejections: BTreeMap<&'static str, u64>,
    pub violations: u64,
    pub elapsed: Duration,
}

/// A report plus the run's diagnostics.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub report: AnalysisReport,
    pub stats: RunStats,
}

/// Stateless analyzer. Every call starts from an empty aggregation.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, ApilogError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Analyze a batch, stamping empty reports with the current time.
    pub fn analyze(&self, raw: &[RawRecord]) -> AnalysisReport {
        self.analyze_at(raw, Utc::now())
    }

    /// Analyze a batch with an explicit `now` for the empty-report time range.
    pub fn analyze_at(&self, raw: &[RawRecord], now: DateTime<Utc>) -> AnalysisReport {
        self.run(raw, now).report
    }

    pub fn run(&self, raw: &[RawRecord], now: DateTime<Utc>) -> AnalysisRun {
        let started = Instant::now();
        let agg = aggregate(raw, &self.config.cost);

        let report = if agg.is_empty() {
            debug!(records = raw.len(), "No valid records, emitting empty report");
            AnalysisReport::empty(self.config.mode, now)
        } else {
            self.build(&agg, now)
        };

        let stats = RunStats {
            seen: raw.len() as u64,
            accepted: agg.total_requests,
            rejected: agg.rejected,
            violations: report.tail.rate_limits().map_or(0, |r| r.total_violations),
            rejections: agg.rejections,
            elapsed: started.elapsed(),
        };

        if stats.violations > 0 {
            warn!(violations = stats.violations, "Rate limit violations detected");
        }

        info!(
            mode = self.config.mode.as_str(),
            seen = stats.seen,
            accepted = stats.accepted,
            rejected = stats.rejected,
            endpoints = report.endpoint_stats.len(),
            issues = report.performance_issues.len(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Analysis complete"
        );

        AnalysisRun { report, stats }
    }

    fn build(&self, agg: &Aggregation, now: DateTime<Utc>) -> AnalysisReport {
        let config = &self.config;
        let summary = build_summary(agg, now);
        let endpoint_stats = calculate_endpoint_stats(agg);
        let performance_issues = detect_performance_issues(&endpoint_stats, &config.thresholds);
        let mut cost_analysis = estimate_costs(agg, &config.cost);

        let tail = match config.mode {
            ReportMode::RateLimits => ReportTail::RateLimits {
                rate_limit_violations: analyze_rate_limits(&agg.records, &config.rate_limiting),
            },
            ReportMode::Caching => {
                let advice =
                    analyze_caching_opportunities(&endpoint_stats, &cost_analysis, &config.caching);
                cost_analysis.optimization_potential_usd = advice.total.cost_savings_usd;
                ReportTail::Caching {
                    caching_opportunities: advice.opportunities,
                    total_potential_savings: advice.total,
                }
            }
        };

        let recommendations = generate_recommendations(&performance_issues, &tail);

        AnalysisReport {
            summary,
            endpoint_stats,
            performance_issues,
            recommendations,
            hourly_distribution: agg.hourly.clone(),
            top_users_by_requests: top_users(agg, config.top_users),
            cost_analysis,
            tail,
        }
    }
}
