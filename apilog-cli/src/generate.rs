//! Synthetic log batches: background traffic followed by a burst that trips
//! the default per-minute limits.

use apilog_core::record::RawRecord;
use apilog_core::time::{format_timestamp, parse_timestamp};
use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

const ENDPOINTS: [&str; 5] = [
    "/api/users",
    "/api/products",
    "/api/orders",
    "/api/search",
    "/api/auth",
];
const METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];
const SUCCESS_CODES: [u16; 4] = [200, 201, 202, 204];
const ERROR_CODES: [u16; 5] = [400, 401, 404, 500, 503];

pub const BURST_USER: &str = "user_999";
pub const BURST_ENDPOINT: &str = "/api/critical";
const START: &str = "2025-01-15T10:00:00Z";
const USERS: usize = 10;

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub count: usize,
    /// Records before this index are background traffic; the rest are burst.
    pub burst_start: usize,
    pub error_probability: f64,
    pub seed: Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            count: 10_000,
            burst_start: 400,
            error_probability: 0.1,
            seed: None,
        }
    }
}

pub fn generate(opts: &GeneratorOptions) -> anyhow::Result<Vec<RawRecord>> {
    let start = parse_timestamp(START)
        .ok_or_else(|| anyhow::anyhow!("bad generator start instant {START}"))?;
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let users: Vec<String> = (0..USERS).map(|i| format!("user_{i:03}")).collect();

    let mut clock = start;
    let mut batch = Vec::with_capacity(opts.count);
    for i in 0..opts.count {
        let record = if i < opts.burst_start {
            clock += TimeDelta::milliseconds(rng.gen_range(100..=500));
            background(&mut rng, i, clock, &users, opts.error_probability)
        } else {
            burst(&mut rng, i, start, &users)
        };
        batch.push(record);
    }
    Ok(batch)
}

fn pick<'a, T: ?Sized>(rng: &mut StdRng, items: &'a [&'a T]) -> &'a T {
    items.choose(rng).copied().unwrap_or(items[0])
}

fn background(
    rng: &mut StdRng,
    i: usize,
    at: DateTime<Utc>,
    users: &[String],
    error_probability: f64,
) -> RawRecord {
    let status = if rng.gen_bool(error_probability) {
        *ERROR_CODES.choose(rng).unwrap_or(&500)
    } else {
        *SUCCESS_CODES.choose(rng).unwrap_or(&200)
    };
    // Spread sizes over the three memory tiers.
    let response_size: u64 = if i % 10 == 0 {
        rng.gen_range(10_241..=50_000)
    } else if i % 5 == 0 {
        rng.gen_range(1_025..=10_240)
    } else {
        rng.gen_range(100..=1_024)
    };
    let user = users.choose(rng).map(String::as_str).unwrap_or("user_000");

    entry(
        at,
        pick(rng, &ENDPOINTS),
        pick(rng, &METHODS),
        status,
        rng.gen_range(100..=1_500),
        user,
        rng.gen_range(100..=1_000),
        response_size,
    )
}

fn burst(rng: &mut StdRng, i: usize, start: DateTime<Utc>, users: &[String]) -> RawRecord {
    let minute = *[2i64, 3].choose(rng).unwrap_or(&2);
    let at = start
        + TimeDelta::minutes(minute)
        + TimeDelta::milliseconds(rng.gen_range(0..30_000));

    // Alternate the hot key between user and endpoint.
    let (user, endpoint) = if i % 2 == 0 {
        (BURST_USER, pick(rng, &ENDPOINTS))
    } else {
        (
            users.choose(rng).map(String::as_str).unwrap_or("user_000"),
            BURST_ENDPOINT,
        )
    };

    entry(
        at,
        endpoint,
        "GET",
        200,
        rng.gen_range(50..=200),
        user,
        100,
        rng.gen_range(100..=500),
    )
}

#[allow(clippy::too_many_arguments)]
fn entry(
    at: DateTime<Utc>,
    endpoint: &str,
    method: &str,
    status: u16,
    response_time_ms: u64,
    user: &str,
    request_size: u64,
    response_size: u64,
) -> RawRecord {
    let value = json!({
        "timestamp": format_timestamp(&at),
        "endpoint": endpoint,
        "method": method,
        "response_time_ms": response_time_ms,
        "status_code": status,
        "user_id": user,
        "request_size_bytes": request_size,
        "response_size_bytes": response_size,
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}
