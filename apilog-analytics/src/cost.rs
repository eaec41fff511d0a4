//! Simulated serverless cost estimation.
//!
//! Sums stay unrounded until the output structs are built: 6 decimals for
//! per-endpoint figures and the breakdown, 2 for the grand total.

use crate::aggregator::Aggregation;
use apilog_core::config::CostConfig;
use apilog_core::time::{round2, round6};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnalysis {
    pub total_cost_usd: f64,
    pub cost_breakdown: CostBreakdown,
    pub cost_by_endpoint: Vec<EndpointCost>,
    /// Caching savings in caching mode, zero otherwise.
    pub optimization_potential_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub request_costs: f64,
    pub execution_costs: f64,
    pub memory_costs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointCost {
    pub endpoint: String,
    pub request_cost: f64,
    pub execution_cost: f64,
    pub memory_cost: f64,
    pub total_cost: f64,
    pub cost_per_request: f64,
}

impl CostAnalysis {
    pub fn empty() -> Self {
        Self {
            total_cost_usd: 0.0,
            cost_breakdown: CostBreakdown::default(),
            cost_by_endpoint: Vec::new(),
            optimization_potential_usd: 0.0,
        }
    }

    /// Reported per-request cost for `endpoint`.
    pub fn cost_per_request(&self, endpoint: &str) -> Option<f64> {
        self.cost_by_endpoint
            .iter()
            .find(|c| c.endpoint == endpoint)
            .map(|c| c.cost_per_request)
    }
}

/// Price every endpoint accumulator and total the batch.
pub fn estimate_costs(agg: &Aggregation, rates: &CostConfig) -> CostAnalysis {
    if agg.is_empty() {
        return CostAnalysis::empty();
    }

    let request_costs = agg.total_requests as f64 * rates.per_request_usd;
    let mut execution_costs = 0.0;
    let mut memory_costs = 0.0;
    let mut cost_by_endpoint = Vec::with_capacity(agg.endpoints.len());

    for (endpoint, acc) in agg.endpoints.iter() {
        if acc.count == 0 {
            continue;
        }
        let request_cost = acc.count as f64 * rates.per_request_usd;
        let execution_cost = acc.total_time_ms as f64 * rates.per_ms_execution_usd;
        let memory_cost = acc.memory_cost_usd;
        let total_cost = request_cost + execution_cost + memory_cost;

        execution_costs += execution_cost;
        memory_costs += memory_cost;

        cost_by_endpoint.push(EndpointCost {
            endpoint: endpoint.to_string(),
            request_cost: round6(request_cost),
            execution_cost: round6(execution_cost),
            memory_cost: round6(memory_cost),
            total_cost: round6(total_cost),
            cost_per_request: round6(total_cost / acc.count as f64),
        });
    }

    CostAnalysis {
        total_cost_usd: round2(request_costs + execution_costs + memory_costs),
        cost_breakdown: CostBreakdown {
            request_costs: round6(request_costs),
            execution_costs: round6(execution_costs),
            memory_costs: round6(memory_costs),
        },
        cost_by_endpoint,
        optimization_potential_usd: 0.0,
    }
}
