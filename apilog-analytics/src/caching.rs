//! Caching-opportunity heuristic.

use crate::cost::CostAnalysis;
use crate::endpoint_stats::EndpointStats;
use apilog_core::config::CachingConfig;
use apilog_core::time::{round2, round6};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachingOpportunity {
    pub endpoint: String,
    /// Whole percent.
    pub potential_cache_hit_rate: u64,
    pub current_requests: u64,
    pub potential_requests_saved: u64,
    pub estimated_cost_savings_usd: f64,
    pub performance_improvement_ms: f64,
    pub recommended_ttl_minutes: u32,
    pub recommendation_confidence: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PotentialSavings {
    pub requests_eliminated: u64,
    pub cost_savings_usd: f64,
    pub performance_improvement_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachingAdvice {
    pub opportunities: Vec<CachingOpportunity>,
    pub total: PotentialSavings,
}

/// Eligibility: enough traffic, mostly GET, few errors, dominant status below 400.
pub fn is_cacheable(stats: &EndpointStats, criteria: &CachingConfig) -> bool {
    stats.request_count > criteria.min_requests
        && stats.get_ratio() >= criteria.min_get_ratio
        && stats.error_rate_percentage <= criteria.max_error_rate
        && stats.most_common_status < 400
}

pub fn analyze_caching_opportunities(
    stats: &[EndpointStats],
    costs: &CostAnalysis,
    criteria: &CachingConfig,
) -> CachingAdvice {
    let mut opportunities = Vec::new();
    let mut requests_eliminated = 0u64;
    let mut cost_savings = 0.0;
    let mut latency_saved = 0.0;

    for s in stats.iter().filter(|s| is_cacheable(s, criteria)) {
        let Some(cost_per_request) = costs.cost_per_request(&s.endpoint) else {
            continue;
        };
        let hit_rate = (s.get_ratio() * 100.0 * criteria.cacheable_get_fraction).floor() as u64;
        let saved = s.request_count * hit_rate / 100;
        let savings = saved as f64 * cost_per_request;
        let improvement = saved as f64 * s.avg_response_time_ms;

        requests_eliminated += saved;
        cost_savings += savings;
        latency_saved += improvement;

        opportunities.push(CachingOpportunity {
            endpoint: s.endpoint.clone(),
            potential_cache_hit_rate: hit_rate,
            current_requests: s.request_count,
            potential_requests_saved: saved,
            estimated_cost_savings_usd: round6(savings),
            performance_improvement_ms: round2(improvement),
            recommended_ttl_minutes: criteria.recommended_ttl_minutes,
            recommendation_confidence: "high",
        });
    }

    CachingAdvice {
        opportunities,
        total: PotentialSavings {
            requests_eliminated,
            cost_savings_usd: round6(cost_savings),
            performance_improvement_ms: round2(latency_saved),
        },
    }
}
