//! Deterministic simulated collaborators.
//!
//! Real payment, reliability, and discovery services live outside this crate.
//! The simulators here implement the same capability traits with fully
//! seed-determined behavior, which is what makes matched-pair fairness and
//! byte-identical reruns testable: every stochastic decision is derived by
//! hashing `(seed, endpoint name, call counter)`, so the same endpoint in the
//! same cycle fails identically in both arms of a pair, regardless of how
//! many queries the gated arm skipped before reaching it.
//!
//! Each simulated endpoint has a stable personality derived from its name
//! alone: a failure probability, a preferred payload envelope, and whether it
//! reprices at query time. The reliability simulator knows the same
//! personality, which is exactly the situation a real uptime oracle
//! approximates.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

use crate::client::{
    EndpointDirectory, PaymentOutcome, PaymentTransport, ReliabilityProbe, ReliabilityVerdict,
};
use crate::endpoint::{Category, Endpoint};
use crate::error::DirectoryError;

/// Cost of one simulated reliability check (USDC).
pub const SIM_CHECK_COST: f64 = 0.001;
/// Uptime below this gets a `should_skip` verdict.
pub const SIM_SKIP_THRESHOLD: f64 = 0.7;
/// Fraction of checks where the reliability service itself is unreachable
/// and fails open.
const PROBE_OUTAGE_RATE: f64 = 0.05;
/// Fraction of queries where the endpoint demands more than its listed price.
const REPRICE_RATE: f64 = 0.10;

const POOL_NAMES: &[&str] = &[
    "defi-pulse",
    "pool-scout",
    "yield-radar",
    "amm-depth",
    "lp-monitor",
    "curve-watch",
    "tvl-lens",
    "swap-meter",
];
const WHALE_NAMES: &[&str] = &[
    "whale-alert",
    "deep-pockets",
    "chain-movers",
    "tide-watch",
    "mega-flow",
    "orca-feed",
    "fin-tracker",
    "pod-signal",
];
const SENTIMENT_NAMES: &[&str] = &[
    "mood-ring",
    "fear-greed",
    "pulse-check",
    "vibe-index",
    "crowd-sense",
    "senti-meter",
    "hype-gauge",
    "tone-scan",
];

// ---------------------------------------------------------------------------
// Deterministic hashing
// ---------------------------------------------------------------------------

/// FNV-1a over arbitrary byte strings, mixed with a seed.
fn mix(seed: u64, parts: &[&[u8]]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
    for part in parts {
        for &b in *part {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x0000_0100_0000_01b3);
        }
        h ^= 0xff;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

/// Uniform draw in `[0, 1)` from a hash.
fn unit(h: u64) -> f64 {
    (h >> 11) as f64 / (1u64 << 53) as f64
}

/// Stable per-endpoint failure probability in `[0.05, 0.75)`, derived from
/// the name alone so the endpoint keeps its personality across seeds.
pub fn endpoint_failure_probability(name: &str) -> f64 {
    0.05 + 0.70 * unit(mix(0, &[b"fail", name.as_bytes()]))
}

/// Which payload envelope this endpoint prefers (stable per name).
fn shape_index(name: &str) -> usize {
    (mix(0, &[b"shape", name.as_bytes()]) % 8) as usize
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Generate a deterministic endpoint catalog with `per_category` endpoints of
/// each category. Prices, repricing, and declared schemas all derive from
/// the endpoint names.
pub fn sim_catalog(per_category: usize) -> Vec<Endpoint> {
    let mut endpoints = Vec::with_capacity(per_category * 3);
    for category in Category::ALL {
        let names = match category {
            Category::Pool => POOL_NAMES,
            Category::Whale => WHALE_NAMES,
            Category::Sentiment => SENTIMENT_NAMES,
        };
        for i in 0..per_category {
            let base = names[i % names.len()];
            let name = if i < names.len() {
                base.to_string()
            } else {
                format!("{base}-{}", i / names.len())
            };
            let declared = 0.002 + 0.018 * unit(mix(0, &[b"price", name.as_bytes()]));
            let reprices = unit(mix(0, &[b"reprice", name.as_bytes()])) < 0.25;
            // A quarter of endpoints publish a schema; the transport honors it.
            let declares_schema = shape_index(&name) == 0;
            endpoints.push(Endpoint {
                url: format!("https://sim.invalid/{category}/{name}"),
                name,
                category,
                declared_price: Some((declared * 1000.0).round() / 1000.0),
                requested_price: if reprices {
                    Some((declared * 1200.0).round() / 1000.0)
                } else {
                    None
                },
                declared_schema: if declares_schema {
                    Some(json!({
                        "type": "object",
                        "properties": {"listings": {"type": "array"}}
                    }))
                } else {
                    None
                },
            });
        }
    }
    endpoints
}

/// Paginated view over a catalog. `looping` directories re-serve the catalog
/// forever — the right shape for cyclical trials that want a page per cycle.
pub struct SimDirectory {
    catalog: Vec<Endpoint>,
    page_size: usize,
    cursor: usize,
    looping: bool,
    poisoned: bool,
}

impl SimDirectory {
    /// Finite directory: serves the catalog once, then reports exhaustion.
    pub fn new(catalog: Vec<Endpoint>, page_size: usize) -> Self {
        Self {
            catalog,
            page_size: page_size.max(1),
            cursor: 0,
            looping: false,
            poisoned: false,
        }
    }

    /// Endless directory: wraps around instead of exhausting.
    pub fn looping(catalog: Vec<Endpoint>, page_size: usize) -> Self {
        Self {
            looping: true,
            ..Self::new(catalog, page_size)
        }
    }

    /// Make every page request fail with a malformed-listing error.
    pub fn poisoned(mut self) -> Self {
        self.poisoned = true;
        self
    }
}

impl EndpointDirectory for SimDirectory {
    fn next_page(&mut self) -> Result<Option<Vec<Endpoint>>, DirectoryError> {
        if self.poisoned {
            return Err(DirectoryError::MalformedListing(
                "listing endpoint returned an HTML error page".into(),
            ));
        }
        if self.catalog.is_empty() {
            return Ok(None);
        }
        if self.cursor >= self.catalog.len() {
            if !self.looping {
                return Ok(None);
            }
            self.cursor = 0;
        }
        let end = (self.cursor + self.page_size).min(self.catalog.len());
        let page = self.catalog[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(Some(page))
    }
}

// ---------------------------------------------------------------------------
// Payment transport
// ---------------------------------------------------------------------------

/// Seeded payment simulator. Each endpoint's n-th query succeeds or fails by
/// hashing `(seed, name, n)`, so both conditions of a matched pair see the
/// same outcome for the same endpoint visit.
pub struct SimTransport {
    seed: u64,
    visits: HashMap<String, u64>,
    /// Latency jitter only — success and spend stay hash-aligned across arms.
    latency_rng: StdRng,
}

impl SimTransport {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            visits: HashMap::new(),
            latency_rng: StdRng::seed_from_u64(seed.wrapping_mul(0x9e37_79b9_7f4a_7c15)),
        }
    }

    fn next_visit(&mut self, name: &str) -> u64 {
        let counter = self.visits.entry(name.to_string()).or_insert(0);
        let visit = *counter;
        *counter += 1;
        visit
    }
}

impl PaymentTransport for SimTransport {
    fn query(&mut self, endpoint: &Endpoint) -> PaymentOutcome {
        let visit = self.next_visit(&endpoint.name);
        let name = endpoint.name.as_bytes();
        let visit_bytes = visit.to_le_bytes();

        let mut spent = endpoint.effective_price();
        if unit(mix(self.seed, &[b"reprice", name, &visit_bytes])) < REPRICE_RATE {
            // Demanded price exceeds what pre-flight budgeted for.
            spent *= 1.5;
        }

        let latency_ms = 20 + self.latency_rng.random_range(0..180u64);

        let fails = unit(mix(self.seed, &[b"call", name, &visit_bytes]))
            < endpoint_failure_probability(&endpoint.name);
        if fails {
            return PaymentOutcome {
                success: false,
                spent,
                payload: None,
                error: Some("upstream timeout".into()),
                latency_ms: latency_ms + 600,
            };
        }

        PaymentOutcome {
            success: true,
            spent,
            payload: Some(build_payload(endpoint, self.seed, visit)),
            error: None,
            latency_ms,
        }
    }
}

/// Wrap category records in the endpoint's preferred envelope.
fn build_payload(endpoint: &Endpoint, seed: u64, visit: u64) -> Value {
    let records = build_records(endpoint, seed, visit);
    match shape_index(&endpoint.name) {
        // Matches the declared schema emitted by `sim_catalog`.
        0 => json!({"listings": records}),
        1 => json!({"success": true, "data": records}),
        2 => json!({"success": true, "data": {"items": records}}),
        3 => json!({"data": records}),
        4 => json!(records),
        5 => json!({"result": records}),
        6 => json!({"response": {"data": records}}),
        // A recognized envelope full of junk: paid, parsed, unusable.
        _ => json!({"data": [{"maintenance": true}]}),
    }
}

fn build_records(endpoint: &Endpoint, seed: u64, visit: u64) -> Vec<Value> {
    let name = endpoint.name.as_bytes();
    let visit_bytes = visit.to_le_bytes();
    let draw = |tag: &[u8], i: u64| unit(mix(seed, &[tag, name, &visit_bytes, &i.to_le_bytes()]));

    (0..3)
        .map(|i| match endpoint.category {
            Category::Pool => {
                let tvl = 200_000.0 + 5_000_000.0 * draw(b"tvl", i);
                json!({
                    "poolId": format!("{}-pool-{i}", endpoint.name),
                    "name": "ETH-USDC",
                    "apy": 2.0 + 28.0 * draw(b"apy", i),
                    "tvlUsd": tvl,
                    "volume24h": tvl * draw(b"vol", i),
                    "feeRate": 0.3,
                })
            }
            Category::Whale => json!({
                "wallet": format!("0x{:016x}", mix(seed, &[b"wallet", name, &i.to_le_bytes()])),
                "action": if draw(b"side", i) < 0.5 { "buy" } else { "sell" },
                "token": (["ETH", "WBTC", "SOL"][(i % 3) as usize]),
                "amount": 10_000.0 + 9_000_000.0 * draw(b"amount", i),
            }),
            Category::Sentiment => json!({
                "token": (["ETH", "WBTC", "SOL"][(i % 3) as usize]),
                "score": 2.0 * draw(b"score", i) - 1.0,
                "confidence": 0.4 + 0.6 * draw(b"conf", i),
            }),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Reliability probe
// ---------------------------------------------------------------------------

/// Seeded reliability simulator: reports an uptime equal to the endpoint's
/// true availability, and fails open during its own (rare) outages.
pub struct SimReliability {
    seed: u64,
    checks: u64,
}

impl SimReliability {
    pub fn new(seed: u64) -> Self {
        Self { seed, checks: 0 }
    }
}

impl ReliabilityProbe for SimReliability {
    fn check(&mut self, endpoint: &Endpoint) -> ReliabilityVerdict {
        let check_index = self.checks;
        self.checks += 1;

        let outage = unit(mix(
            self.seed,
            &[b"outage", endpoint.name.as_bytes(), &check_index.to_le_bytes()],
        )) < PROBE_OUTAGE_RATE;
        if outage {
            return ReliabilityVerdict::fail_open(SIM_CHECK_COST);
        }

        let uptime = 1.0 - endpoint_failure_probability(&endpoint.name);
        ReliabilityVerdict {
            working: uptime >= SIM_SKIP_THRESHOLD,
            uptime_fraction: uptime,
            should_skip: uptime < SIM_SKIP_THRESHOLD,
            cost: SIM_CHECK_COST,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
