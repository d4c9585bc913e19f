//! Response normalization: heterogeneous endpoint payloads in, comparable
//! records out.
//!
//! Paid data endpoints wrap their records in wildly different envelopes and
//! field names. This module is the single gateway that turns a raw decoded
//! payload into a [`ValidationOutcome`]: first *shape detection* locates the
//! record array (declared schema first, then a fixed precedence of structural
//! patterns), then *field extraction* maps each record's fields through
//! ordered candidate-name lists and normalizes units.
//!
//! The module is stateless. Unparseable numeric fields degrade to `None` and
//! records missing mandatory fields are dropped individually — a single junk
//! record never poisons the batch. The IL-risk and whale-significance scores
//! at the bottom are illustrative heuristics, kept as named constants so they
//! stay adjustable.

use serde::Serialize;
use serde_json::Value;

use crate::endpoint::Category;

/// Key names tried, in order, when hunting for the record array inside an
/// unrecognized envelope.
const PRIORITY_ARRAY_KEYS: &[&str] = &[
    "topProtocols",
    "topPools",
    "topCoins",
    "pools",
    "protocols",
    "items",
    "results",
    "entries",
    "data",
    "whales",
    "transactions",
    "moves",
    "trades",
    "scores",
    "sentiment",
    "tokens",
    "coins",
];

/// Volume/TVL ratio below which a pool's impermanent-loss risk reads low.
const IL_RISK_LOW_RATIO: f64 = 0.1;
/// Volume/TVL ratio above which a pool's impermanent-loss risk reads high.
const IL_RISK_HIGH_RATIO: f64 = 0.5;
/// Divisor for `log10(amount)` when scoring whale-move significance.
const SIGNIFICANCE_LOG_DIVISOR: f64 = 7.0;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// How the record array was located in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchemaSource {
    /// The endpoint's declared schema matched.
    #[serde(rename = "declared-schema")]
    Declared,
    /// One of the fixed structural patterns matched.
    #[serde(rename = "pattern-match")]
    Pattern,
    /// Nothing matched (or no query was made).
    #[serde(rename = "none")]
    None,
}

/// Impermanent-loss risk bucket derived from the volume/TVL ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IlRisk {
    Low,
    Medium,
    High,
}

/// A liquidity pool after field mapping. APY and fee rate are fractions
/// (0.05 = 5%), TVL and volume are USD.
#[derive(Debug, Clone, Serialize)]
pub struct PoolRecord {
    pub pool_id: String,
    pub token_a: String,
    pub token_b: String,
    pub apy: Option<f64>,
    pub tvl_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub fee_rate: Option<f64>,
    pub il_risk: IlRisk,
}

/// A large-wallet move after field mapping.
#[derive(Debug, Clone, Serialize)]
pub struct WhaleRecord {
    pub wallet: String,
    pub action: String,
    pub token: String,
    pub amount: Option<f64>,
    pub usd_value: Option<f64>,
    /// `log10(amount) / 7`, clamped to `[0, 1]`. Zero when amount is unknown.
    pub significance: f64,
}

/// A token sentiment reading after field mapping. Score is in `[-1, 1]`.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentRecord {
    pub token: String,
    pub score: f64,
    pub confidence: Option<f64>,
}

/// One normalized record of any category.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Pool(PoolRecord),
    Whale(WhaleRecord),
    Sentiment(SentimentRecord),
}

/// Outcome of normalizing one raw response.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    /// True when a record array was located *and* at least one record
    /// survived field mapping. A recognized envelope holding nothing usable
    /// is still an unusable payload.
    pub valid: bool,
    pub records: Vec<Record>,
    pub schema_source: SchemaSource,
    pub error: Option<String>,
}

impl ValidationOutcome {
    /// Outcome for an attempt where no payload was ever inspected
    /// (transport failure or reliability skip).
    pub fn not_inspected() -> Self {
        Self {
            valid: false,
            records: Vec::new(),
            schema_source: SchemaSource::None,
            error: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            records: Vec::new(),
            schema_source: SchemaSource::None,
            error: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shape detection
// ---------------------------------------------------------------------------

/// Validate a raw decoded payload and extract comparable records.
///
/// Tries the declared schema first, then the fixed pattern precedence. A
/// payload matching no pattern, or yielding zero usable records, comes back
/// `valid = false` with a diagnostic string.
pub fn validate_response(
    payload: Option<&Value>,
    category: Category,
    declared_schema: Option<&Value>,
) -> ValidationOutcome {
    let Some(payload) = payload else {
        return ValidationOutcome::rejected("empty payload");
    };
    if payload.is_null() {
        return ValidationOutcome::rejected("null payload");
    }

    let Some((items, schema_source)) = locate_records(payload, declared_schema) else {
        return ValidationOutcome::rejected(format!(
            "unrecognized response shape for {category} payload"
        ));
    };

    let records: Vec<Record> = match category {
        Category::Pool => extract_pool_data(&items).into_iter().map(Record::Pool).collect(),
        Category::Whale => extract_whale_data(&items).into_iter().map(Record::Whale).collect(),
        Category::Sentiment => extract_sentiment_data(&items)
            .into_iter()
            .map(Record::Sentiment)
            .collect(),
    };

    if records.is_empty() {
        return ValidationOutcome {
            valid: false,
            records,
            schema_source,
            error: Some("no usable records after field mapping".into()),
        };
    }

    ValidationOutcome {
        valid: true,
        records,
        schema_source,
        error: None,
    }
}

/// Locate the record array. Declared schema first, then structural patterns
/// in fixed precedence; first match wins.
fn locate_records(
    payload: &Value,
    declared_schema: Option<&Value>,
) -> Option<(Vec<Value>, SchemaSource)> {
    if let Some(schema) = declared_schema
        && let Some(items) = match_declared_schema(payload, schema)
    {
        return Some((items, SchemaSource::Declared));
    }

    // 1. {success: true, data: [..]}
    // 2. {success: true, data: {<nested array>}}
    if payload.get("success").and_then(Value::as_bool) == Some(true)
        && let Some(data) = payload.get("data")
    {
        if let Some(arr) = data.as_array() {
            return Some((arr.clone(), SchemaSource::Pattern));
        }
        if let Some(arr) = nested_array(data) {
            return Some((arr, SchemaSource::Pattern));
        }
    }

    // 3. {data: [..]}
    // 4. {data: {<nested array>}}
    if let Some(data) = payload.get("data") {
        if let Some(arr) = data.as_array() {
            return Some((arr.clone(), SchemaSource::Pattern));
        }
        if let Some(arr) = nested_array(data) {
            return Some((arr, SchemaSource::Pattern));
        }
    }

    // 5. Payload itself is the array.
    if let Some(arr) = payload.as_array() {
        return Some((arr.clone(), SchemaSource::Pattern));
    }

    // 6. {result: [..]}
    if let Some(arr) = payload.get("result").and_then(Value::as_array) {
        return Some((arr.clone(), SchemaSource::Pattern));
    }

    // 7. {response: {data: [..]}}
    if let Some(arr) = payload
        .get("response")
        .and_then(|r| r.get("data"))
        .and_then(Value::as_array)
    {
        return Some((arr.clone(), SchemaSource::Pattern));
    }

    // 8. First array under a priority key, then any array under any key.
    nested_array(payload).map(|arr| (arr, SchemaSource::Pattern))
}

/// Declared-schema matching: the payload's type must match the schema's, and
/// the schema must point at an array-valued field (or be an array itself).
fn match_declared_schema(payload: &Value, schema: &Value) -> Option<Vec<Value>> {
    let schema_type = schema.get("type").and_then(Value::as_str);

    if schema_type == Some("array") {
        return payload.as_array().cloned();
    }

    let properties = schema.get("properties")?.as_object()?;
    let obj = payload.as_object()?;
    for (key, prop) in properties {
        if prop.get("type").and_then(Value::as_str) == Some("array")
            && let Some(arr) = obj.get(key).and_then(Value::as_array)
        {
            return Some(arr.clone());
        }
    }
    None
}

/// Find an array one level down inside an object: priority keys first, then
/// any key at all.
fn nested_array(value: &Value) -> Option<Vec<Value>> {
    let obj = value.as_object()?;
    for key in PRIORITY_ARRAY_KEYS {
        if let Some(arr) = obj.get(*key).and_then(Value::as_array) {
            return Some(arr.clone());
        }
    }
    for (_key, candidate) in obj {
        if let Some(arr) = candidate.as_array() {
            return Some(arr.clone());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// Map raw pool items to [`PoolRecord`]s. Items missing an id or either
/// token are dropped individually.
pub fn extract_pool_data(items: &[Value]) -> Vec<PoolRecord> {
    items
        .iter()
        .filter_map(|item| {
            let pool_id = string_field(
                item,
                &["poolId", "pool_id", "id", "address", "pairAddress", "pair_address"],
            )?;

            let mut token_a =
                string_field(item, &["tokenA", "token_a", "token0", "baseToken", "base_token"]);
            let mut token_b =
                string_field(item, &["tokenB", "token_b", "token1", "quoteToken", "quote_token"]);

            // Fall back to splitting a pair name like "AVNT-USDC".
            if token_a.is_none() || token_b.is_none() {
                let name = string_field(item, &["name", "pair", "symbol", "market"]);
                if let Some((a, b)) = name.as_deref().and_then(split_pair_name) {
                    token_a.get_or_insert(a);
                    token_b.get_or_insert(b);
                }
            }
            let (token_a, token_b) = (token_a?, token_b?);

            let apy = percentage_field(item, &["apy", "apr", "apy.total", "apr.total", "apyBase"]);
            let tvl_usd = numeric_field(
                item,
                &["tvlUsd", "tvl_usd", "tvl", "liquidityUsd", "liquidity", "totalLiquidity"],
            );
            let volume_24h_usd = numeric_field(
                item,
                &["volume24h", "volume_24h", "volumeUsd", "volume_usd", "volume", "dailyVolume"],
            );
            let fee_rate = percentage_field(item, &["feeRate", "fee_rate", "fee", "feeTier", "fee_tier"]);

            Some(PoolRecord {
                pool_id,
                token_a,
                token_b,
                apy,
                tvl_usd,
                volume_24h_usd,
                fee_rate,
                il_risk: il_risk_from(volume_24h_usd, tvl_usd),
            })
        })
        .collect()
}

/// Map raw whale items to [`WhaleRecord`]s. Items missing wallet, action, or
/// token are dropped individually.
pub fn extract_whale_data(items: &[Value]) -> Vec<WhaleRecord> {
    items
        .iter()
        .filter_map(|item| {
            let wallet = string_field(
                item,
                &["wallet", "address", "walletAddress", "wallet_address", "from", "account"],
            )?;
            let action = string_field(item, &["action", "type", "side", "direction", "event"])?;
            let token = string_field(item, &["token", "symbol", "asset", "coin", "currency"])?;

            let amount = numeric_field(
                item,
                &["amount", "tokenAmount", "token_amount", "quantity", "size", "value"],
            );
            let usd_value = numeric_field(
                item,
                &["usdValue", "usd_value", "amountUsd", "amount_usd", "valueUsd", "value_usd"],
            );

            Some(WhaleRecord {
                wallet,
                action,
                token,
                amount,
                usd_value,
                significance: whale_significance(amount),
            })
        })
        .collect()
}

/// Map raw sentiment items to [`SentimentRecord`]s. Items missing a token or
/// score are dropped individually.
pub fn extract_sentiment_data(items: &[Value]) -> Vec<SentimentRecord> {
    items
        .iter()
        .filter_map(|item| {
            let token = string_field(item, &["token", "symbol", "coin", "asset", "name"])?;
            let score = numeric_field(
                item,
                &["score", "sentiment", "sentimentScore", "sentiment_score", "value"],
            )
            .map(normalize_sentiment)?;
            let confidence = numeric_field(item, &["confidence", "certainty", "probability"])
                .map(normalize_probability);

            Some(SentimentRecord {
                token,
                score,
                confidence,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Field lookup helpers
// ---------------------------------------------------------------------------

/// Resolve a dotted path like `apr.total` by walking the object graph.
fn walk_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// First present, non-null candidate field.
fn first_field<'a>(item: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|c| {
            if c.contains('.') {
                walk_path(item, c)
            } else {
                item.get(*c)
            }
        })
        .find(|v| !v.is_null())
}

/// String-valued field. Accepts plain strings and `{symbol}` / `{name}`
/// token objects.
fn string_field(item: &Value, candidates: &[&str]) -> Option<String> {
    let v = first_field(item, candidates)?;
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(_) => v
            .get("symbol")
            .or_else(|| v.get("name"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Numeric field coerced through [`coerce_number`]. Unparseable values
/// degrade to `None`.
fn numeric_field(item: &Value, candidates: &[&str]) -> Option<f64> {
    first_field(item, candidates).and_then(coerce_number)
}

/// Percentage-typed field. Percent strings (`"5.2%"`) already encode the
/// division; everything else goes through [`normalize_percentage`].
fn percentage_field(item: &Value, candidates: &[&str]) -> Option<f64> {
    let v = first_field(item, candidates)?;
    if let Value::String(s) = v
        && s.trim_end().ends_with('%')
    {
        return parse_percent_string(s);
    }
    coerce_number(v).map(normalize_percentage)
}

// ---------------------------------------------------------------------------
// Numeric coercion and unit normalization
// ---------------------------------------------------------------------------

/// Coerce a JSON value to `f64`: numbers directly, strings through the
/// currency/percentage parsers.
pub fn coerce_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric_string(s),
        _ => None,
    }
}

/// Parse a numeric string in any of the formats endpoints actually emit:
/// plain floats, `"$1,234.56"`, `"$1.13M"`, `"461398.90%"`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.ends_with('%') {
        return parse_percent_string(s);
    }
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    parse_currency(s)
}

/// Parse currency strings: strip `$` and commas, then apply a `K/M/B/T`
/// suffix multiplier, case-insensitively.
pub fn parse_currency(s: &str) -> Option<f64> {
    let stripped: String = s
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if stripped.is_empty() {
        return None;
    }

    let last = stripped.chars().last()?;
    let multiplier = match last.to_ascii_uppercase() {
        'K' => Some(1e3),
        'M' => Some(1e6),
        'B' => Some(1e9),
        'T' => Some(1e12),
        _ => None,
    };

    match multiplier {
        Some(m) => {
            let head = &stripped[..stripped.len() - last.len_utf8()];
            head.trim().parse::<f64>().ok().map(|v| v * m)
        }
        None => stripped.parse::<f64>().ok(),
    }
}

/// Parse `"461398.90%"` to `4613.989`: strip the sign, parse, divide by 100.
pub fn parse_percent_string(s: &str) -> Option<f64> {
    s.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .map(|v| v / 100.0)
}

/// Percentage-like values (APY, fee rate): anything above 1 is taken as an
/// already-scaled percentage and divided by 100, so both `5` and `0.05` read
/// as five percent. Values at or below 1 pass through as fractions.
pub fn normalize_percentage(v: f64) -> f64 {
    if v > 1.0 { v / 100.0 } else { v }
}

/// Probability-like values (confidence): above 1 means percent, divide.
pub fn normalize_probability(v: f64) -> f64 {
    if v > 1.0 { v / 100.0 } else { v }
}

/// Sentiment scores land in `[-1, 1]`: values already there pass through,
/// `[-100, 100]` divides by 100, anything wilder divides then clamps.
pub fn normalize_sentiment(v: f64) -> f64 {
    if (-1.0..=1.0).contains(&v) {
        v
    } else if (-100.0..=100.0).contains(&v) {
        v / 100.0
    } else {
        (v / 100.0).clamp(-1.0, 1.0)
    }
}

/// Split a pair name like `"AVNT-USDC"` into token symbols on the first
/// matching separator among `-`, `/`, `_`, space, in that priority.
pub fn split_pair_name(name: &str) -> Option<(String, String)> {
    for sep in ['-', '/', '_', ' '] {
        if let Some((a, b)) = name.split_once(sep) {
            let (a, b) = (a.trim(), b.trim());
            if !a.is_empty() && !b.is_empty() {
                return Some((a.to_string(), b.to_string()));
            }
        }
    }
    None
}

/// IL-risk bucket from the volume/TVL ratio. Unknown inputs read as low.
pub fn il_risk_from(volume: Option<f64>, tvl: Option<f64>) -> IlRisk {
    let (Some(volume), Some(tvl)) = (volume, tvl) else {
        return IlRisk::Low;
    };
    if tvl <= 0.0 {
        return IlRisk::Low;
    }
    let ratio = volume / tvl;
    if ratio < IL_RISK_LOW_RATIO {
        IlRisk::Low
    } else if ratio < IL_RISK_HIGH_RATIO {
        IlRisk::Medium
    } else {
        IlRisk::High
    }
}

/// Whale-move significance: `log10(amount) / 7` clamped to `[0, 1]`.
pub fn whale_significance(amount: Option<f64>) -> f64 {
    match amount {
        Some(a) if a > 0.0 => (a.log10() / SIGNIFICANCE_LOG_DIVISOR).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool_items() -> Value {
        json!([
            {"poolId": "p1", "tokenA": "ETH", "tokenB": "USDC", "apy": 5.0, "tvlUsd": 1_000_000.0, "volume24h": 50_000.0},
            {"poolId": "p2", "name": "AVNT-USDC", "apr": {"total": 12.5}, "tvl": "$1.13M"},
        ])
    }

    // -----------------------------------------------------------------------
    // Shape detection
    // -----------------------------------------------------------------------

    #[test]
    fn test_success_data_array_pattern() {
        let payload = json!({"success": true, "data": pool_items()});
        let outcome = validate_response(Some(&payload), Category::Pool, None);
        assert!(outcome.valid);
        assert_eq!(outcome.schema_source, SchemaSource::Pattern);
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn test_success_data_nested_pattern() {
        let payload = json!({"success": true, "data": {"pools": pool_items()}});
        let outcome = validate_response(Some(&payload), Category::Pool, None);
        assert!(outcome.valid);
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn test_bare_array_pattern() {
        let payload = pool_items();
        let outcome = validate_response(Some(&payload), Category::Pool, None);
        assert!(outcome.valid);
    }

    #[test]
    fn test_result_and_response_data_patterns() {
        let a = json!({"result": pool_items()});
        let b = json!({"response": {"data": pool_items()}});
        assert!(validate_response(Some(&a), Category::Pool, None).valid);
        assert!(validate_response(Some(&b), Category::Pool, None).valid);
    }

    #[test]
    fn test_priority_key_pattern() {
        let payload = json!({"meta": {"page": 1}, "topPools": pool_items()});
        let outcome = validate_response(Some(&payload), Category::Pool, None);
        assert!(outcome.valid);
    }

    #[test]
    fn test_any_array_under_any_key() {
        let payload = json!({"weird_key": pool_items()});
        let outcome = validate_response(Some(&payload), Category::Pool, None);
        assert!(outcome.valid);
    }

    #[test]
    fn test_declared_schema_wins() {
        let payload = json!({"listings": pool_items(), "data": []});
        let schema = json!({"type": "object", "properties": {"listings": {"type": "array"}}});
        let outcome = validate_response(Some(&payload), Category::Pool, Some(&schema));
        assert!(outcome.valid);
        assert_eq!(outcome.schema_source, SchemaSource::Declared);
    }

    #[test]
    fn test_declared_schema_type_mismatch_falls_back() {
        // Schema says array, payload is an object: patterns take over.
        let payload = json!({"data": pool_items()});
        let schema = json!({"type": "array"});
        let outcome = validate_response(Some(&payload), Category::Pool, Some(&schema));
        assert!(outcome.valid);
        assert_eq!(outcome.schema_source, SchemaSource::Pattern);
    }

    #[test]
    fn test_null_payload_rejected() {
        let outcome = validate_response(Some(&Value::Null), Category::Pool, None);
        assert!(!outcome.valid);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_missing_payload_rejected() {
        let outcome = validate_response(None, Category::Pool, None);
        assert!(!outcome.valid);
    }

    #[test]
    fn test_unrecognized_shape_rejected() {
        let payload = json!({"status": "ok", "count": 3});
        let outcome = validate_response(Some(&payload), Category::Pool, None);
        assert!(!outcome.valid);
        assert_eq!(outcome.schema_source, SchemaSource::None);
        assert!(outcome.error.unwrap().contains("unrecognized"));
    }

    #[test]
    fn test_recognized_shape_with_no_usable_records_is_invalid() {
        let payload = json!({"success": true, "data": [{"junk": 1}]});
        let outcome = validate_response(Some(&payload), Category::Pool, None);
        assert!(!outcome.valid);
        assert_eq!(outcome.records.len(), 0);
    }

    // -----------------------------------------------------------------------
    // Pool extraction
    // -----------------------------------------------------------------------

    #[test]
    fn test_pool_mandatory_fields_roundtrip() {
        let items = vec![json!({
            "poolId": "p1", "tokenA": "ETH", "tokenB": "USDC", "apy": 0.05
        })];
        let pools = extract_pool_data(&items);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].pool_id, "p1");
        assert_eq!(pools[0].token_a, "ETH");
        assert_eq!(pools[0].token_b, "USDC");
    }

    #[test]
    fn test_pool_tokens_from_pair_name() {
        let items = vec![json!({"id": "p9", "name": "AVNT-USDC"})];
        let pools = extract_pool_data(&items);
        assert_eq!(pools[0].token_a, "AVNT");
        assert_eq!(pools[0].token_b, "USDC");
    }

    #[test]
    fn test_pool_token_objects() {
        let items = vec![json!({
            "id": "p3", "token0": {"symbol": "WBTC"}, "token1": {"symbol": "DAI"}
        })];
        let pools = extract_pool_data(&items);
        assert_eq!(pools[0].token_a, "WBTC");
        assert_eq!(pools[0].token_b, "DAI");
    }

    #[test]
    fn test_pool_missing_mandatory_dropped_not_fatal() {
        let items = vec![
            json!({"poolId": "good", "tokenA": "A", "tokenB": "B"}),
            json!({"poolId": "no-tokens"}),
            json!({"tokenA": "A", "tokenB": "B"}),
        ];
        let pools = extract_pool_data(&items);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].pool_id, "good");
    }

    #[test]
    fn test_pool_dotted_apr_path() {
        let items = vec![json!({"id": "p", "name": "A-B", "apr": {"total": 12.5}})];
        let pools = extract_pool_data(&items);
        let apy = pools[0].apy.unwrap();
        assert!((apy - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_pool_unparseable_numeric_degrades_to_none() {
        let items = vec![json!({"id": "p", "name": "A-B", "tvlUsd": "soon™"})];
        let pools = extract_pool_data(&items);
        assert_eq!(pools.len(), 1);
        assert!(pools[0].tvl_usd.is_none());
    }

    #[test]
    fn test_il_risk_buckets() {
        assert_eq!(il_risk_from(Some(5_000.0), Some(100_000.0)), IlRisk::Low);
        assert_eq!(il_risk_from(Some(20_000.0), Some(100_000.0)), IlRisk::Medium);
        assert_eq!(il_risk_from(Some(60_000.0), Some(100_000.0)), IlRisk::High);
        assert_eq!(il_risk_from(None, Some(1.0)), IlRisk::Low);
    }

    // -----------------------------------------------------------------------
    // Whale extraction
    // -----------------------------------------------------------------------

    #[test]
    fn test_whale_extraction() {
        let items = vec![json!({
            "wallet": "0xabc", "action": "buy", "token": "ETH",
            "amount": 10_000_000.0, "usdValue": "$25.4M"
        })];
        let whales = extract_whale_data(&items);
        assert_eq!(whales.len(), 1);
        assert_eq!(whales[0].wallet, "0xabc");
        assert!((whales[0].usd_value.unwrap() - 25_400_000.0).abs() < 1.0);
        assert!((whales[0].significance - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_whale_significance_scale() {
        // log10(1e7)/7 = 1.0, log10(10)/7 ≈ 0.143
        assert!((whale_significance(Some(1e7)) - 1.0).abs() < 1e-12);
        assert!((whale_significance(Some(10.0)) - 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(whale_significance(None), 0.0);
        assert_eq!(whale_significance(Some(0.0)), 0.0);
    }

    #[test]
    fn test_whale_missing_action_dropped() {
        let items = vec![json!({"wallet": "0xabc", "token": "ETH"})];
        assert!(extract_whale_data(&items).is_empty());
    }

    // -----------------------------------------------------------------------
    // Sentiment extraction
    // -----------------------------------------------------------------------

    #[test]
    fn test_sentiment_extraction_and_scaling() {
        let items = vec![
            json!({"token": "ETH", "score": 0.7}),
            json!({"token": "BTC", "sentiment": 65.0, "confidence": 80.0}),
        ];
        let scores = extract_sentiment_data(&items);
        assert_eq!(scores.len(), 2);
        assert!((scores[0].score - 0.7).abs() < 1e-12);
        assert!((scores[1].score - 0.65).abs() < 1e-12);
        assert!((scores[1].confidence.unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_sentiment_missing_score_dropped() {
        let items = vec![json!({"token": "ETH"})];
        assert!(extract_sentiment_data(&items).is_empty());
    }

    // -----------------------------------------------------------------------
    // Numeric parsing and unit normalization
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_currency_suffixes() {
        assert!((parse_currency("$1.13M").unwrap() - 1_130_000.0).abs() < 1e-6);
        assert!((parse_currency("$148.60B").unwrap() - 148_600_000_000.0).abs() < 1.0);
        assert!((parse_currency("$1,234.56").unwrap() - 1234.56).abs() < 1e-9);
        assert!((parse_currency("2.5k").unwrap() - 2500.0).abs() < 1e-9);
        assert!((parse_currency("3T").unwrap() - 3e12).abs() < 1.0);
        assert!(parse_currency("$").is_none());
    }

    #[test]
    fn test_parse_percent_string() {
        assert!((parse_percent_string("461398.90%").unwrap() - 4613.989).abs() < 1e-9);
        assert!((parse_percent_string("5%").unwrap() - 0.05).abs() < 1e-12);
        assert!(parse_percent_string("n/a%").is_none());
    }

    #[test]
    fn test_percentage_normalization_idempotence() {
        // Both a fraction and a scaled percentage read as five percent.
        assert!((normalize_percentage(0.05) - 0.05).abs() < 1e-12);
        assert!((normalize_percentage(5.0) - 0.05).abs() < 1e-12);
        assert!((normalize_percentage(50.0) - 0.50).abs() < 1e-12);
    }

    #[test]
    fn test_sentiment_normalization_rules() {
        assert!((normalize_sentiment(-0.4) - -0.4).abs() < 1e-12);
        assert!((normalize_sentiment(85.0) - 0.85).abs() < 1e-12);
        assert!((normalize_sentiment(-250.0) - -1.0).abs() < 1e-12);
    }

    #[test]
    fn test_split_pair_name_separator_priority() {
        assert_eq!(split_pair_name("AVNT-USDC"), Some(("AVNT".into(), "USDC".into())));
        assert_eq!(split_pair_name("ETH/DAI"), Some(("ETH".into(), "DAI".into())));
        assert_eq!(split_pair_name("A_B"), Some(("A".into(), "B".into())));
        assert_eq!(split_pair_name("WBTC USDT"), Some(("WBTC".into(), "USDT".into())));
        // '-' outranks '/'
        assert_eq!(split_pair_name("A-B/C"), Some(("A".into(), "B/C".into())));
        assert_eq!(split_pair_name("SINGLE"), None);
    }
}
