// Constant-product (x*y=k) curve, full range
// ------------------------------------------
// Float version of the volatile-pool math: the optimizer only needs the
// price response, not the integer swap rounding.
//
//   price      p = y / x
//   at price q x(q) = sqrt(k/q),  y(q) = sqrt(k*q)
//
// Fees are expected to be folded into the reserves upstream.

use serde::{Deserialize, Serialize};

use super::{ensure_distinct, ensure_positive, Curve, CurveError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstantProductCurve {
    pub cid: String,
    pub tknx: String,
    pub tkny: String,
    pub x: f64, // reserve of tknx (human units)
    pub y: f64, // reserve of tkny (human units)
}

impl ConstantProductCurve {
    pub fn new(cid: &str, tknx: &str, tkny: &str, x: f64, y: f64) -> Result<Self, CurveError> {
        let c = ConstantProductCurve {
            cid: cid.to_string(),
            tknx: tknx.to_string(),
            tkny: tkny.to_string(),
            x,
            y,
        };
        c.validate()?;
        Ok(c)
    }

    /// Build from a price and the tknx reserve; handy for fixtures.
    pub fn from_price(cid: &str, tknx: &str, tkny: &str, price: f64, x: f64) -> Result<Self, CurveError> {
        ensure_positive(cid, "price", price)?;
        Self::new(cid, tknx, tkny, x, x * price)
    }

    pub fn validate(&self) -> Result<(), CurveError> {
        ensure_distinct(&self.cid, &self.tknx, &self.tkny)?;
        ensure_positive(&self.cid, "x", self.x)?;
        ensure_positive(&self.cid, "y", self.y)
    }

    #[inline]
    pub fn k(&self) -> f64 {
        self.x * self.y
    }

    /// Reserves the pool would hold at marginal price `p`.
    #[inline]
    pub fn reserves_at_price(&self, p: f64) -> (f64, f64) {
        let k = self.k();
        ((k / p).sqrt(), (k * p).sqrt())
    }
}

impl Curve for ConstantProductCurve {
    fn cid(&self) -> &str {
        &self.cid
    }

    fn tknx(&self) -> &str {
        &self.tknx
    }

    fn tkny(&self) -> &str {
        &self.tkny
    }

    fn price(&self) -> f64 {
        self.y / self.x
    }

    fn flow_from_price(&self, p: f64) -> (f64, f64) {
        let (x1, y1) = self.reserves_at_price(p);
        (x1 - self.x, y1 - self.y)
    }
}
