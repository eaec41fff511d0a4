//! Retrospective sliding-window rate-limit analysis.
//!
//! Records must arrive in non-decreasing timestamp order. For every record the
//! four (scope, window) pairs are evaluated in a fixed order: user×minute,
//! endpoint×minute, user×hour, endpoint×hour. Each evaluation appends the
//! record's instant, prunes entries at or before `instant - window`, and
//! compares the remaining count against the configured limit.
//!
//! A violation is logged only if no violation for the same key and window was
//! logged less than `dedup_window_secs` earlier (log time), so a sustained
//! overage yields one alert per interval rather than one per request.

use apilog_core::config::{RateLimitConfig, WindowLimits, WindowStrategy};
use apilog_core::record::LogRecord;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace, warn};

/// Window granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Minute,
    Hour,
}

impl WindowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Minute => "minute",
            WindowKind::Hour => "hour",
        }
    }

    pub fn length(&self) -> TimeDelta {
        match self {
            WindowKind::Minute => TimeDelta::seconds(60),
            WindowKind::Hour => TimeDelta::seconds(3600),
        }
    }

    fn limit(&self, limits: &WindowLimits) -> u64 {
        match self {
            WindowKind::Minute => limits.per_minute,
            WindowKind::Hour => limits.per_hour,
        }
    }
}

/// What a tracker is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    Endpoint,
}

impl Scope {
    fn key_of<'r>(&self, record: &'r LogRecord) -> &'r str {
        match self {
            Scope::User => &record.user_id,
            Scope::Endpoint => &record.endpoint,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Endpoint => "endpoint",
        }
    }
}

/// Evaluation order within one record.
const CHECKS: [(Scope, WindowKind); 4] = [
    (Scope::User, WindowKind::Minute),
    (Scope::Endpoint, WindowKind::Minute),
    (Scope::User, WindowKind::Hour),
    (Scope::Endpoint, WindowKind::Hour),
];

/// The offending key of a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ViolationKey {
    User { user_id: String },
    Endpoint { endpoint: String },
}

impl ViolationKey {
    fn new(scope: Scope, key: &str) -> Self {
        match scope {
            Scope::User => ViolationKey::User { user_id: key.to_string() },
            Scope::Endpoint => ViolationKey::Endpoint { endpoint: key.to_string() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub violation_type: WindowKind,
    pub limit: u64,
    pub actual_count: u64,
    #[serde(with = "apilog_core::time::log_format")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub key: ViolationKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitReport {
    pub user_violations: Vec<Violation>,
    pub endpoint_violations: Vec<Violation>,
    pub total_violations: u64,
}

impl RateLimitReport {
    /// Up to `n` distinct violating user ids, in the order first flagged.
    pub fn violating_users(&self, n: usize) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.user_violations
            .iter()
            .filter_map(|v| match &v.key {
                ViolationKey::User { user_id } => Some(user_id.as_str()),
                ViolationKey::Endpoint { .. } => None,
            })
            .filter(|id| seen.insert(*id))
            .take(n)
            .collect()
    }
}

/// Per-key timestamp history for one window.
#[derive(Debug, Default)]
struct WindowTracker {
    history: HashMap<String, VecDeque<DateTime<Utc>>>,
}

impl WindowTracker {
    /// Optionally record `instant`, prune to the window ending at it, and return the count.
    fn observe(
        &mut self,
        key: &str,
        instant: DateTime<Utc>,
        window: TimeDelta,
        append: bool,
    ) -> u64 {
        let history = self.history.entry(key.to_string()).or_default();
        if append {
            history.push_back(instant);
        }
        let cutoff = instant - window;
        while history.front().is_some_and(|t| *t <= cutoff) {
            history.pop_front();
        }
        history.len() as u64
    }
}

/// Trackers and logged violations for one scope.
#[derive(Debug, Default)]
struct ScopeState {
    /// Minute history; also the shared history under [`WindowStrategy::Shared`].
    minute: WindowTracker,
    hour: WindowTracker,
    last_logged: HashMap<(String, WindowKind), DateTime<Utc>>,
    violations: Vec<Violation>,
}

impl ScopeState {
    fn observe(
        &mut self,
        key: &str,
        window: WindowKind,
        instant: DateTime<Utc>,
        strategy: WindowStrategy,
    ) -> u64 {
        match (strategy, window) {
            (_, WindowKind::Minute) => self.minute.observe(key, instant, window.length(), true),
            (WindowStrategy::Independent, WindowKind::Hour) => {
                self.hour.observe(key, instant, window.length(), true)
            }
            // Already appended and minute-pruned this record.
            (WindowStrategy::Shared, WindowKind::Hour) => {
                self.minute.observe(key, instant, window.length(), false)
            }
        }
    }

    /// Log unless a violation for the same key/window is younger than `dedup`.
    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        scope: Scope,
        key: &str,
        window: WindowKind,
        limit: u64,
        count: u64,
        instant: DateTime<Utc>,
        dedup: TimeDelta,
    ) {
        let slot = (key.to_string(), window);
        if let Some(last) = self.last_logged.get(&slot) {
            if instant - *last < dedup {
                trace!(scope = scope.as_str(), key, ?window, count, "Violation suppressed");
                return;
            }
        }
        debug!(scope = scope.as_str(), key, ?window, limit, count, "Rate limit violation");
        self.last_logged.insert(slot, instant);
        self.violations.push(Violation {
            violation_type: window,
            limit,
            actual_count: count,
            timestamp: instant,
            key: ViolationKey::new(scope, key),
        });
    }
}

/// Sliding-window violation detector. State lives for one `analyze` call.
pub struct RateLimitAnalyzer<'a> {
    config: &'a RateLimitConfig,
    users: ScopeState,
    endpoints: ScopeState,
    dedup: TimeDelta,
    last_instant: Option<DateTime<Utc>>,
    out_of_order: u64,
}

impl<'a> RateLimitAnalyzer<'a> {
    /// A de-dup interval too large for `TimeDelta` saturates, suppressing every repeat.
    pub fn new(config: &'a RateLimitConfig) -> Self {
        Self {
            config,
            dedup: config.dedup_window().unwrap_or(TimeDelta::MAX),
            users: ScopeState::default(),
            endpoints: ScopeState::default(),
            last_instant: None,
            out_of_order: 0,
        }
    }

    fn limits(&self, scope: Scope) -> &WindowLimits {
        match scope {
            Scope::User => &self.config.rules.per_user,
            Scope::Endpoint => &self.config.rules.per_endpoint,
        }
    }

    /// Feed one record. Must not be older than the previous one.
    pub fn observe(&mut self, record: &LogRecord) {
        let instant = record.timestamp;
        if self.last_instant.is_some_and(|last| instant < last) {
            self.out_of_order += 1;
        }
        self.last_instant = Some(instant);

        let strategy = self.config.window_strategy;
        let dedup = self.dedup;

        for (scope, window) in CHECKS {
            let key = scope.key_of(record);
            let limit = window.limit(self.limits(scope));
            let state = match scope {
                Scope::User => &mut self.users,
                Scope::Endpoint => &mut self.endpoints,
            };
            let count = state.observe(key, window, instant, strategy);
            if count > limit {
                state.record(scope, key, window, limit, count, instant, dedup);
            }
        }
    }

    pub fn finish(self) -> RateLimitReport {
        if self.out_of_order > 0 {
            warn!(
                records = self.out_of_order,
                "Rate-limit input was not time-sorted; window counts are unreliable"
            );
        }
        let total_violations =
            (self.users.violations.len() + self.endpoints.violations.len()) as u64;
        RateLimitReport {
            user_violations: self.users.violations,
            endpoint_violations: self.endpoints.violations,
            total_violations,
        }
    }
}

/// Run the detector over a time-sorted record sequence.
pub fn analyze_rate_limits(records: &[LogRecord], config: &RateLimitConfig) -> RateLimitReport {
    let mut analyzer = RateLimitAnalyzer::new(config);
    for record in records {
        analyzer.observe(record);
    }
    analyzer.finish()
}
