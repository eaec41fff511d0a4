use crate::performance::PerformanceIssue;
use crate::report::ReportTail;

/// How many violating users the rate-limit line names.
const MAX_NAMED_USERS: usize = 3;

/// Human-readable actions: performance issues first, then the mode-specific lines.
pub fn generate_recommendations(issues: &[PerformanceIssue], tail: &ReportTail) -> Vec<String> {
    let mut lines: Vec<String> = issues.iter().map(describe_issue).collect();

    match tail {
        ReportTail::RateLimits {
            rate_limit_violations: report,
        } => {
            if report.total_violations > 0 {
                lines.push(format!(
                    "Rate limit alert: {} violations detected \
                     ({} user-scoped, {} endpoint-scoped). Review throttling policies.",
                    report.total_violations,
                    report.user_violations.len(),
                    report.endpoint_violations.len(),
                ));
                let users = report.violating_users(MAX_NAMED_USERS);
                if !users.is_empty() {
                    lines.push(format!("Users exceeding rate limits: {}.", users.join(", ")));
                }
            }
        }
        ReportTail::Caching {
            caching_opportunities,
            ..
        } => {
            for op in caching_opportunities {
                lines.push(format!(
                    "Consider caching for {} ({} requests, {}% cache-hit potential).",
                    op.endpoint, op.current_requests, op.potential_cache_hit_rate
                ));
            }
        }
    }

    lines
}

fn describe_issue(issue: &PerformanceIssue) -> String {
    match issue {
        PerformanceIssue::SlowEndpoint {
            endpoint,
            avg_response_time_ms,
            threshold_ms,
            severity,
        } => format!(
            "Investigate {endpoint} performance \
             (avg {avg_response_time_ms:.2}ms exceeds {threshold_ms}ms threshold). Severity: {}.",
            severity.as_str().to_uppercase()
        ),
        PerformanceIssue::HighErrorRate {
            endpoint,
            error_rate_percentage,
            severity,
            ..
        } => format!(
            "Alert: {endpoint} has {error_rate_percentage:.2}% error rate. Severity: {}.",
            severity.as_str().to_uppercase()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::{CachingOpportunity, PotentialSavings};
    use crate::performance::Severity;
    use crate::rate_limit::{RateLimitReport, Violation, ViolationKey, WindowKind};
    use apilog_core::config::ReportMode;
    use apilog_core::time::parse_timestamp;

    fn user_violation(user: &str) -> Violation {
        Violation {
            violation_type: WindowKind::Minute,
            limit: 100,
            actual_count: 101,
            timestamp: parse_timestamp("2025-01-15T10:02:00Z").unwrap(),
            key: ViolationKey::User { user_id: user.into() },
        }
    }

    #[test]
    fn issue_lines_carry_severity() {
        let issues = vec![
            PerformanceIssue::SlowEndpoint {
                endpoint: "/search".into(),
                avg_response_time_ms: 1250.5,
                threshold_ms: 1000,
                severity: Severity::High,
            },
            PerformanceIssue::HighErrorRate {
                endpoint: "/auth".into(),
                error_rate_percentage: 100.0,
                threshold_percentage: 15.0,
                severity: Severity::Critical,
            },
        ];
        let lines = generate_recommendations(&issues, &ReportTail::empty(ReportMode::RateLimits));
        assert_eq!(
            lines,
            vec![
                "Investigate /search performance \
                 (avg 1250.50ms exceeds 1000ms threshold). Severity: HIGH.",
                "Alert: /auth has 100.00% error rate. Severity: CRITICAL.",
            ]
        );
    }

    #[test]
    fn no_findings_no_lines() {
        for mode in [ReportMode::RateLimits, ReportMode::Caching] {
            assert!(generate_recommendations(&[], &ReportTail::empty(mode)).is_empty());
        }
    }

    #[test]
    fn rate_limit_lines_name_three_distinct_users() {
        let report = RateLimitReport {
            user_violations: ["u1", "u2", "u1", "u3", "u4"]
                .iter()
                .map(|u| user_violation(u))
                .collect(),
            endpoint_violations: Vec::new(),
            total_violations: 5,
        };
        let tail = ReportTail::RateLimits { rate_limit_violations: report };
        let lines = generate_recommendations(&[], &tail);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Rate limit alert: 5 violations detected"));
        assert_eq!(lines[1], "Users exceeding rate limits: u1, u2, u3.");
    }

    #[test]
    fn endpoint_only_violations_name_no_users() {
        let report = RateLimitReport {
            user_violations: Vec::new(),
            endpoint_violations: vec![Violation {
                key: ViolationKey::Endpoint { endpoint: "/api/critical".into() },
                ..user_violation("unused")
            }],
            total_violations: 1,
        };
        let tail = ReportTail::RateLimits { rate_limit_violations: report };
        let lines = generate_recommendations(&[], &tail);
        assert_eq!(
            lines,
            vec![
                "Rate limit alert: 1 violations detected (0 user-scoped, 1 endpoint-scoped). \
                 Review throttling policies."
            ]
        );
    }

    #[test]
    fn caching_lines_only_in_caching_mode() {
        let op = CachingOpportunity {
            endpoint: "/catalog".into(),
            potential_cache_hit_rate: 95,
            current_requests: 101,
            potential_requests_saved: 95,
            estimated_cost_savings_usd: 0.03,
            performance_improvement_ms: 100.0,
            recommended_ttl_minutes: 15,
            recommendation_confidence: "high",
        };
        let tail = ReportTail::Caching {
            caching_opportunities: vec![op],
            total_potential_savings: PotentialSavings::default(),
        };
        let lines = generate_recommendations(&[], &tail);
        assert_eq!(
            lines,
            vec!["Consider caching for /catalog (101 requests, 95% cache-hit potential)."]
        );
    }
}
