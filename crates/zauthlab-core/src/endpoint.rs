//! Endpoint candidates and their pricing metadata.
//!
//! An [`Endpoint`] is what the discovery collaborator hands us: a paid data
//! API with a declared price and category. Endpoints are immutable for the
//! duration of a run; the engine never mutates or re-fetches them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback effective price (USDC) when an endpoint declares no price at all.
pub const DEFAULT_PRICE_FLOOR: f64 = 0.001;

/// Data category served by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// DeFi liquidity pool listings (APY, TVL, volume).
    Pool,
    /// Large-wallet transaction feeds.
    Whale,
    /// Token sentiment scores.
    Sentiment,
}

impl Category {
    /// All categories in the fixed iteration order used by the engines.
    pub const ALL: [Category; 3] = [Category::Pool, Category::Whale, Category::Sentiment];

    /// Parse from a lowercase name. Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pool" | "pools" => Some(Self::Pool),
            "whale" | "whales" => Some(Self::Whale),
            "sentiment" => Some(Self::Sentiment),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pool => write!(f, "pool"),
            Self::Whale => write!(f, "whale"),
            Self::Sentiment => write!(f, "sentiment"),
        }
    }
}

/// A paid data endpoint as reported by the discovery collaborator.
///
/// `declared_price` is the catalog price; `requested_price` is the price the
/// endpoint actually demanded at payment time, when known. The two can
/// legitimately differ — endpoints reprice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub declared_price: Option<f64>,
    #[serde(default)]
    pub requested_price: Option<f64>,
    /// Response schema declared in the endpoint's catalog entry, if any.
    /// Consulted first by the response normalizer.
    #[serde(default)]
    pub declared_schema: Option<Value>,
}

impl Endpoint {
    /// Price used for budgeting and sorting: the requested price if known,
    /// else the declared price, else [`DEFAULT_PRICE_FLOOR`].
    pub fn effective_price(&self) -> f64 {
        self.requested_price
            .or(self.declared_price)
            .unwrap_or(DEFAULT_PRICE_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("pool"), Some(Category::Pool));
        assert_eq!(Category::parse("whales"), Some(Category::Whale));
        assert_eq!(Category::parse("sentiment"), Some(Category::Sentiment));
        assert_eq!(Category::parse("bogus"), None);
    }

    #[test]
    fn test_category_display_roundtrip() {
        for cat in Category::ALL {
            assert_eq!(Category::parse(&cat.to_string()), Some(cat));
        }
    }

    #[test]
    fn test_effective_price_prefers_requested() {
        let ep = Endpoint {
            url: "https://example.invalid/pools".into(),
            name: "pools".into(),
            category: Category::Pool,
            declared_price: Some(0.01),
            requested_price: Some(0.02),
            declared_schema: None,
        };
        assert!((ep.effective_price() - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn test_effective_price_falls_back_to_declared() {
        let ep = Endpoint {
            url: "https://example.invalid/pools".into(),
            name: "pools".into(),
            category: Category::Pool,
            declared_price: Some(0.01),
            requested_price: None,
            declared_schema: None,
        };
        assert!((ep.effective_price() - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_effective_price_floor() {
        let ep = Endpoint {
            url: "https://example.invalid/pools".into(),
            name: "pools".into(),
            category: Category::Pool,
            declared_price: None,
            requested_price: None,
            declared_schema: None,
        };
        assert!((ep.effective_price() - DEFAULT_PRICE_FLOOR).abs() < f64::EPSILON);
    }
}
