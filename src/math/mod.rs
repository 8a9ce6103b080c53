// Curve capability + reference AMM families
// -----------------------------------------
// The optimizer only ever talks to `Curve`. Concrete families live in the
// sibling modules and are bundled into `AnyCurve` so a snapshot can be a
// homogeneous Vec that serde can read off the wire.
//
// Conventions shared by every family:
// - price is token-y per token-x (tkny / tknx)
// - flows are seen from the curve: positive = token goes INTO the pool

pub mod concentrated;
pub mod constant_product;
pub mod order_ladder;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use concentrated::ConcentratedCurve;
pub use constant_product::ConstantProductCurve;
pub use order_ladder::{LadderLevel, OrderLadderCurve};

/// token -> price, every price expressed in one common numeraire
pub type PriceMap = BTreeMap<String, f64>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CurveError {
    #[error("curve {cid}: tknx and tkny must differ (both {token})")]
    SameToken { cid: String, token: String },
    #[error("curve {cid}: {field} must be finite and > 0 (got {value})")]
    NonPositive { cid: String, field: &'static str, value: f64 },
    #[error("curve {cid}: price {price} outside range [{lo}, {hi}]")]
    PriceOutOfRange { cid: String, price: f64, lo: f64, hi: f64 },
    #[error("curve {cid}: ladder levels must move strictly away from {reference}")]
    UnorderedLevels { cid: String, reference: f64 },
}

/// Unordered token pair. Stored sorted so A/B and B/A land in the same group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair {
    lo: String,
    hi: String,
}

impl Pair {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Pair { lo: a.to_string(), hi: b.to_string() }
        } else {
            Pair { lo: b.to_string(), hi: a.to_string() }
        }
    }

    pub fn tokens(&self) -> (&str, &str) {
        (&self.lo, &self.hi)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.lo, self.hi)
    }
}

/// Price-response capability of one liquidity curve.
///
/// Implementations are immutable snapshots: every method is a pure function of
/// the curve state and its arguments.
pub trait Curve {
    /// Stable identifier, carried into trade instructions.
    fn cid(&self) -> &str;

    fn tknx(&self) -> &str;

    fn tkny(&self) -> &str;

    /// Marginal price, tkny per tknx.
    fn price(&self) -> f64;

    /// Change in curve holdings `(dx, dy)` when the market moves the curve
    /// from its current state to marginal price `p`.
    fn flow_from_price(&self, p: f64) -> (f64, f64);

    fn pair(&self) -> Pair {
        Pair::new(self.tknx(), self.tkny())
    }

    fn tokens(&self) -> [&str; 2] {
        [self.tknx(), self.tkny()]
    }

    /// Same as `flow_from_price`, but driven by a token price map in any
    /// common numeraire. Returns None if either token is missing a price.
    fn flow_vector_from_price_vector(&self, prices: &PriceMap) -> Option<[(&str, f64); 2]> {
        let px = *prices.get(self.tknx())?;
        let py = *prices.get(self.tkny())?;
        let (dx, dy) = self.flow_from_price(px / py);
        Some([(self.tknx(), dx), (self.tkny(), dy)])
    }
}

/// Closed set of curve families a snapshot can carry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyCurve {
    ConstantProduct(ConstantProductCurve),
    Concentrated(ConcentratedCurve),
    OrderLadder(OrderLadderCurve),
}

impl AnyCurve {
    pub fn validate(&self) -> Result<(), CurveError> {
        match self {
            AnyCurve::ConstantProduct(c) => c.validate(),
            AnyCurve::Concentrated(c) => c.validate(),
            AnyCurve::OrderLadder(c) => c.validate(),
        }
    }
}

impl Curve for AnyCurve {
    fn cid(&self) -> &str {
        match self {
            AnyCurve::ConstantProduct(c) => c.cid(),
            AnyCurve::Concentrated(c) => c.cid(),
            AnyCurve::OrderLadder(c) => c.cid(),
        }
    }

    fn tknx(&self) -> &str {
        match self {
            AnyCurve::ConstantProduct(c) => c.tknx(),
            AnyCurve::Concentrated(c) => c.tknx(),
            AnyCurve::OrderLadder(c) => c.tknx(),
        }
    }

    fn tkny(&self) -> &str {
        match self {
            AnyCurve::ConstantProduct(c) => c.tkny(),
            AnyCurve::Concentrated(c) => c.tkny(),
            AnyCurve::OrderLadder(c) => c.tkny(),
        }
    }

    fn price(&self) -> f64 {
        match self {
            AnyCurve::ConstantProduct(c) => c.price(),
            AnyCurve::Concentrated(c) => c.price(),
            AnyCurve::OrderLadder(c) => c.price(),
        }
    }

    fn flow_from_price(&self, p: f64) -> (f64, f64) {
        match self {
            AnyCurve::ConstantProduct(c) => c.flow_from_price(p),
            AnyCurve::Concentrated(c) => c.flow_from_price(p),
            AnyCurve::OrderLadder(c) => c.flow_from_price(p),
        }
    }
}

impl From<ConstantProductCurve> for AnyCurve {
    fn from(c: ConstantProductCurve) -> Self {
        AnyCurve::ConstantProduct(c)
    }
}

impl From<ConcentratedCurve> for AnyCurve {
    fn from(c: ConcentratedCurve) -> Self {
        AnyCurve::Concentrated(c)
    }
}

impl From<OrderLadderCurve> for AnyCurve {
    fn from(c: OrderLadderCurve) -> Self {
        AnyCurve::OrderLadder(c)
    }
}

#[inline]
pub(crate) fn ensure_positive(cid: &str, field: &'static str, value: f64) -> Result<(), CurveError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CurveError::NonPositive { cid: cid.to_string(), field, value })
    }
}

#[inline]
pub(crate) fn ensure_distinct(cid: &str, tknx: &str, tkny: &str) -> Result<(), CurveError> {
    if tknx == tkny {
        Err(CurveError::SameToken { cid: cid.to_string(), token: tknx.to_string() })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_unordered() {
        assert_eq!(Pair::new("WETH", "USDC"), Pair::new("USDC", "WETH"));
        assert_eq!(Pair::new("WETH", "USDC").to_string(), "USDC/WETH");
        assert_eq!(Pair::new("B", "A").tokens(), ("A", "B"));
    }

    #[test]
    fn test_flow_vector_uses_price_ratio() {
        let c = ConstantProductCurve::new("c1", "ETH", "USDC", 10.0, 20_000.0)
            .expect("valid curve");
        let mut prices = PriceMap::new();
        prices.insert("ETH".to_string(), 2_000.0);
        prices.insert("USDC".to_string(), 1.0);

        // 2000 USDC/ETH is the curve's own price -> no flow
        let flows = c.flow_vector_from_price_vector(&prices).expect("prices present");
        assert_eq!(flows[0].0, "ETH");
        assert!(flows[0].1.abs() < 1e-9);
        assert!(flows[1].1.abs() < 1e-6);

        prices.remove("USDC");
        assert!(c.flow_vector_from_price_vector(&prices).is_none());
    }

    #[test]
    fn test_any_curve_serde_tag() {
        let json = serde_json::json!({
            "kind": "constant_product",
            "cid": "uni-v2-1",
            "tknx": "WETH",
            "tkny": "USDC",
            "x": 100.0,
            "y": 350000.0
        });
        let curve: AnyCurve = serde_json::from_value(json).expect("deserialize curve");
        assert_eq!(curve.cid(), "uni-v2-1");
        assert!((curve.price() - 3500.0).abs() < 1e-9);
        assert!(curve.validate().is_ok());
    }
}
