use crate::error::ApilogError;
use chrono::TimeDelta;
use figment::{Figment, providers::{Env, Format, Serialized, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Which report tail is produced.
    #[serde(default)]
    pub mode: ReportMode,
    /// How many users `top_users_by_requests` lists.
    #[serde(default = "default_top_users")]
    pub top_users: usize,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub caching: CachingConfig,
    #[serde(default)]
    pub rate_limiting: RateLimitConfig,
}

/// Report variant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Tail carries `rate_limit_violations`.
    #[default]
    RateLimits,
    /// Tail carries `caching_opportunities` and `total_potential_savings`.
    Caching,
}

impl ReportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::RateLimits => "rate_limits",
            ReportMode::Caching => "caching",
        }
    }
}

/// Performance-issue severity ladders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_latency_ladder")]
    pub latency_ms: SeverityLadder<u64>,
    #[serde(default = "default_error_ladder")]
    pub error_rate_percent: SeverityLadder<f64>,
}

/// Three ascending thresholds; a metric strictly above one reaches that tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityLadder<T> {
    pub medium: T,
    pub high: T,
    pub critical: T,
}

/// Simulated serverless pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_per_request")]
    pub per_request_usd: f64,
    #[serde(default = "default_per_ms")]
    pub per_ms_execution_usd: f64,
    /// Ascending response-size brackets. The last one must be unbounded.
    #[serde(default = "default_memory_tiers")]
    pub memory_tiers: Vec<MemoryTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryTier {
    /// Inclusive byte ceiling; `None` = unbounded.
    pub max_bytes: Option<u64>,
    pub cost_usd: f64,
}

/// Caching eligibility criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachingConfig {
    /// Endpoints need strictly more requests than this.
    #[serde(default = "default_min_requests")]
    pub min_requests: u64,
    #[serde(default = "default_min_get_ratio")]
    pub min_get_ratio: f64,
    /// Inclusive upper bound, in percent.
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate: f64,
    #[serde(default = "default_ttl")]
    pub recommended_ttl_minutes: u32,
    /// Share of GET traffic assumed servable from cache.
    #[serde(default = "default_cacheable_fraction")]
    pub cacheable_get_fraction: f64,
}

/// Retrospective rate-limit analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub window_strategy: WindowStrategy,
    /// Suppress a repeat violation for the same key and window within this many seconds.
    #[serde(default = "default_dedup_secs")]
    pub dedup_window_secs: u64,
    #[serde(default)]
    pub rules: RateLimitRules,
}

/// Scope → window → limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRules {
    #[serde(default = "default_user_limits")]
    pub per_user: WindowLimits,
    #[serde(default = "default_endpoint_limits")]
    pub per_endpoint: WindowLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowLimits {
    pub per_minute: u64,
    pub per_hour: u64,
}

/// How minute and hour windows share timestamp history.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WindowStrategy {
    /// Separate history per window; the hour check sees the full hour.
    #[default]
    Independent,
    /// One history per key, pruned by the minute window before the hour check.
    Shared,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_top_users() -> usize { 5 }
fn default_latency_ladder() -> SeverityLadder<u64> {
    SeverityLadder { medium: 500, high: 1000, critical: 2000 }
}
fn default_error_ladder() -> SeverityLadder<f64> {
    SeverityLadder { medium: 5.0, high: 10.0, critical: 15.0 }
}
fn default_per_request() -> f64 { 0.0001 }
fn default_per_ms() -> f64 { 0.000002 }
fn default_memory_tiers() -> Vec<MemoryTier> {
    vec![
        MemoryTier { max_bytes: Some(1024), cost_usd: 0.00001 },
        MemoryTier { max_bytes: Some(10240), cost_usd: 0.00005 },
        MemoryTier { max_bytes: None, cost_usd: 0.0001 },
    ]
}
fn default_min_requests() -> u64 { 100 }
fn default_min_get_ratio() -> f64 { 0.80 }
fn default_max_error_rate() -> f64 { 2.0 }
fn default_ttl() -> u32 { 15 }
fn default_cacheable_fraction() -> f64 { 0.95 }
fn default_dedup_secs() -> u64 { 1 }
fn default_user_limits() -> WindowLimits {
    WindowLimits { per_minute: 100, per_hour: 1000 }
}
fn default_endpoint_limits() -> WindowLimits {
    WindowLimits { per_minute: 500, per_hour: 10000 }
}

// ── Impls ─────────────────────────────────────────────────────

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: ReportMode::default(),
            top_users: default_top_users(),
            thresholds: ThresholdConfig::default(),
            cost: CostConfig::default(),
            caching: CachingConfig::default(),
            rate_limiting: RateLimitConfig::default(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ladder(),
            error_rate_percent: default_error_ladder(),
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            per_request_usd: default_per_request(),
            per_ms_execution_usd: default_per_ms(),
            memory_tiers: default_memory_tiers(),
        }
    }
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            min_requests: default_min_requests(),
            min_get_ratio: default_min_get_ratio(),
            max_error_rate: default_max_error_rate(),
            recommended_ttl_minutes: default_ttl(),
            cacheable_get_fraction: default_cacheable_fraction(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_strategy: WindowStrategy::default(),
            dedup_window_secs: default_dedup_secs(),
            rules: RateLimitRules::default(),
        }
    }
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self {
            per_user: default_user_limits(),
            per_endpoint: default_endpoint_limits(),
        }
    }
}

impl<T: PartialOrd> SeverityLadder<T> {
    fn is_ascending(&self) -> bool {
        self.medium <= self.high && self.high <= self.critical
    }
}

impl CostConfig {
    /// Flat cost of one response of `size_bytes`: the first ceiling not exceeded wins.
    pub fn memory_cost(&self, size_bytes: u64) -> f64 {
        self.memory_tiers
            .iter()
            .find(|tier| tier.max_bytes.is_none_or(|max| size_bytes <= max))
            .or(self.memory_tiers.last())
            .map(|tier| tier.cost_usd)
            .unwrap_or(0.0)
    }
}

impl RateLimitConfig {
    /// The de-dup interval as a duration; fails when it does not fit a `TimeDelta`.
    pub fn dedup_window(&self) -> Result<TimeDelta, ApilogError> {
        i64::try_from(self.dedup_window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                ApilogError::ConfigError(format!(
                    "dedup_window_secs {} is out of range",
                    self.dedup_window_secs
                ))
            })
    }
}

impl AnalyzerConfig {
    /// Load configuration from YAML file + env overrides.
    ///
    /// Env keys use the `APILOG_` prefix and `__` for nesting, e.g.
    /// `APILOG_RATE_LIMITING__RULES__PER_USER__PER_MINUTE=50`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: AnalyzerConfig = Figment::from(Serialized::defaults(AnalyzerConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("APILOG_").split("__"))
            .extract()?;
        config.validate()?;
        tracing::debug!(
            mode = config.mode.as_str(),
            strategy = ?config.rate_limiting.window_strategy,
            tiers = config.cost.memory_tiers.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Reject tables the engine cannot evaluate.
    pub fn validate(&self) -> Result<(), ApilogError> {
        let tiers = &self.cost.memory_tiers;
        let Some(last) = tiers.last() else {
            return Err(ApilogError::ConfigError("memory_tiers must not be empty".into()));
        };
        if last.max_bytes.is_some() {
            return Err(ApilogError::ConfigError(
                "last memory tier must be unbounded (max_bytes: null)".into(),
            ));
        }
        let bounded: Vec<u64> = tiers.iter().filter_map(|t| t.max_bytes).collect();
        if bounded.len() != tiers.len() - 1 {
            return Err(ApilogError::ConfigError(
                "only the last memory tier may be unbounded".into(),
            ));
        }
        if bounded.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ApilogError::ConfigError(
                "memory tier ceilings must be strictly ascending".into(),
            ));
        }
        if tiers.iter().any(|t| t.cost_usd < 0.0) {
            return Err(ApilogError::ConfigError("memory tier cost must be >= 0".into()));
        }
        if self.cost.per_request_usd < 0.0 || self.cost.per_ms_execution_usd < 0.0 {
            return Err(ApilogError::ConfigError("cost rates must be >= 0".into()));
        }
        if !self.thresholds.latency_ms.is_ascending() {
            return Err(ApilogError::ConfigError(
                "latency thresholds must be medium <= high <= critical".into(),
            ));
        }
        if !self.thresholds.error_rate_percent.is_ascending() {
            return Err(ApilogError::ConfigError(
                "error-rate thresholds must be medium <= high <= critical".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.caching.cacheable_get_fraction) {
            return Err(ApilogError::ConfigError(
                "cacheable_get_fraction must be within [0, 1]".into(),
            ));
        }
        self.rate_limiting.dedup_window()?;
        Ok(())
    }
}
