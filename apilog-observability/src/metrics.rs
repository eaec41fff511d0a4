use crate::prometheus_exporter::render_metrics;
use apilog_analytics::AnalysisRun;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

/// Run metrics. All counters are gated behind `enabled`.
///
/// When disabled, no registry is created and every `record_*` call returns
/// immediately.
pub struct MetricsCollector {
    enabled: bool,
    registry: Option<Registry>,
    pub records_total: Option<IntCounterVec>,
    pub rejections_total: Option<IntCounterVec>,
    pub violations_total: Option<IntCounterVec>,
    pub issues_total: Option<IntCounterVec>,
    pub endpoints: Option<IntGauge>,
    pub analysis_duration: Option<HistogramVec>,
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self {
                enabled: false,
                registry: None,
                records_total: None,
                rejections_total: None,
                violations_total: None,
                issues_total: None,
                endpoints: None,
                analysis_duration: None,
            });
        }

        let registry = Registry::new();

        let records_total = IntCounterVec::new(
            Opts::new("records_total", "Input records by validation outcome").namespace("apilog"),
            &["outcome"],
        )?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Dropped records by reason").namespace("apilog"),
            &["reason"],
        )?;

        let violations_total = IntCounterVec::new(
            Opts::new("rate_limit_violations_total", "Logged rate-limit violations")
                .namespace("apilog"),
            &["scope", "window"],
        )?;

        let issues_total = IntCounterVec::new(
            Opts::new("performance_issues_total", "Detected performance issues")
                .namespace("apilog"),
            &["type", "severity"],
        )?;

        let endpoints = IntGauge::with_opts(
            Opts::new("endpoints", "Distinct endpoints in the last report").namespace("apilog"),
        )?;

        let analysis_duration = HistogramVec::new(
            HistogramOpts::new("analysis_duration_seconds", "Wall time of one analysis run")
                .namespace("apilog")
                .buckets(vec![
                    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0,
                ]),
            &["mode"],
        )?;

        registry.register(Box::new(records_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(violations_total.clone()))?;
        registry.register(Box::new(issues_total.clone()))?;
        registry.register(Box::new(endpoints.clone()))?;
        registry.register(Box::new(analysis_duration.clone()))?;

        Ok(Self {
            enabled: true,
            registry: Some(registry),
            records_total: Some(records_total),
            rejections_total: Some(rejections_total),
            violations_total: Some(violations_total),
            issues_total: Some(issues_total),
            endpoints: Some(endpoints),
            analysis_duration: Some(analysis_duration),
        })
    }

    /// Fold one run into the counters (no-op when disabled).
    pub fn record_run(&self, run: &AnalysisRun) {
        if !self.enabled {
            return;
        }
        let stats = &run.stats;
        let report = &run.report;

        if let Some(ref counter) = self.records_total {
            counter.with_label_values(&["accepted"]).inc_by(stats.accepted);
            counter.with_label_values(&["rejected"]).inc_by(stats.rejected);
        }
        if let Some(ref counter) = self.rejections_total {
            for (reason, n) in &stats.rejections {
                counter.with_label_values(&[reason]).inc_by(*n);
            }
        }
        if let (Some(counter), Some(violations)) =
            (&self.violations_total, report.tail.rate_limits())
        {
            for v in &violations.user_violations {
                counter.with_label_values(&["user", v.violation_type.as_str()]).inc();
            }
            for v in &violations.endpoint_violations {
                counter.with_label_values(&["endpoint", v.violation_type.as_str()]).inc();
            }
        }
        if let Some(ref counter) = self.issues_total {
            for issue in &report.performance_issues {
                counter
                    .with_label_values(&[issue.kind(), issue.severity().as_str()])
                    .inc();
            }
        }
        if let Some(ref gauge) = self.endpoints {
            gauge.set(report.endpoint_stats.len() as i64);
        }
        if let Some(ref hist) = self.analysis_duration {
            hist.with_label_values(&[report.tail.mode().as_str()])
                .observe(stats.elapsed.as_secs_f64());
        }
    }

    /// Count records dropped before they reached the engine (non-object array elements).
    pub fn record_skipped(&self, skipped: u64) {
        if !self.enabled || skipped == 0 {
            return;
        }
        if let Some(ref counter) = self.records_total {
            counter.with_label_values(&["rejected"]).inc_by(skipped);
        }
        if let Some(ref counter) = self.rejections_total {
            counter.with_label_values(&["not_an_object"]).inc_by(skipped);
        }
    }

    /// Prometheus text exposition, empty when disabled.
    pub fn render(&self) -> String {
        match self.registry {
            Some(ref registry) => render_metrics(registry),
            None => String::new(),
        }
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apilog_analytics::Analyzer;
    use apilog_core::config::{AnalyzerConfig, RateLimitConfig};
    use apilog_core::record::RawRecord;
    use apilog_core::time::parse_timestamp;
    use serde_json::json;

    fn raw(i: i64, user: &str, time_ms: u64) -> RawRecord {
        let ts = parse_timestamp("2025-01-15T10:00:00Z").unwrap() + chrono::TimeDelta::seconds(i);
        json!({
            "timestamp": ts.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "endpoint": "/api/orders", "method": "POST",
            "response_time_ms": time_ms, "status_code": 200, "user_id": user,
            "request_size_bytes": 64, "response_size_bytes": 256
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn run(batch: &[RawRecord], config: AnalyzerConfig) -> AnalysisRun {
        let now = parse_timestamp("2025-01-16T00:00:00Z").unwrap();
        Analyzer::new(config).unwrap().run(batch, now)
    }

    // ── Disabled collector ───────────────────────────────────────

    #[test]
    fn disabled_collector_is_inert() {
        let mc = MetricsCollector::new(false).unwrap();
        assert!(!mc.is_enabled());
        assert!(mc.registry().is_none());
        assert!(mc.records_total.is_none());
        mc.record_run(&run(&[], AnalyzerConfig::default()));
        mc.record_skipped(3);
        assert_eq!(mc.render(), "");
    }

    // ── Enabled collector ────────────────────────────────────────

    #[test]
    fn records_outcomes_and_reasons() {
        let mc = MetricsCollector::new(true).unwrap();
        let mut batch = vec![raw(0, "u1", 10), raw(1, "u1", 10)];
        batch.push(json!({ "endpoint": "/x" }).as_object().cloned().unwrap());
        mc.record_run(&run(&batch, AnalyzerConfig::default()));
        mc.record_skipped(2);

        let records = mc.records_total.as_ref().unwrap();
        assert_eq!(records.with_label_values(&["accepted"]).get(), 2);
        assert_eq!(records.with_label_values(&["rejected"]).get(), 3);

        let reasons = mc.rejections_total.as_ref().unwrap();
        assert_eq!(reasons.with_label_values(&["missing_field"]).get(), 1);
        assert_eq!(reasons.with_label_values(&["not_an_object"]).get(), 2);
        assert_eq!(mc.endpoints.as_ref().unwrap().get(), 1);
    }

    #[test]
    fn violations_and_issues_are_labelled() {
        let mut config = AnalyzerConfig::default();
        config.rate_limiting = RateLimitConfig::default();
        config.rate_limiting.rules.per_user.per_minute = 2;
        let batch: Vec<RawRecord> = (0..3).map(|i| raw(i, "u1", 2500)).collect();

        let mc = MetricsCollector::new(true).unwrap();
        mc.record_run(&run(&batch, config));

        let violations = mc.violations_total.as_ref().unwrap();
        assert_eq!(violations.with_label_values(&["user", "minute"]).get(), 1);
        assert_eq!(violations.with_label_values(&["endpoint", "minute"]).get(), 0);

        let issues = mc.issues_total.as_ref().unwrap();
        assert_eq!(issues.with_label_values(&["slow_endpoint", "critical"]).get(), 1);

        let text = mc.render();
        assert!(text.contains("apilog_rate_limit_violations_total"));
        assert!(text.contains("apilog_analysis_duration_seconds_bucket"));
        assert!(text.contains("mode=\"rate_limits\""));
    }
}
