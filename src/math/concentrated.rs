// Concentrated-liquidity curve (single range)
// -------------------------------------------
// One v3-style position: liquidity L active on [p_lo, p_hi].
//
//   real x at price q: L * (1/sqrt(q) - 1/sqrt(p_hi))
//   real y at price q: L * (sqrt(q) - sqrt(p_lo))
//
// Outside the range the position is fully converted and stops trading, so the
// target price is clamped before computing flows. A position sitting on one of
// its bounds is a range (limit) order; see the one-sided constructors.

use serde::{Deserialize, Serialize};

use super::{ensure_distinct, ensure_positive, Curve, CurveError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcentratedCurve {
    pub cid: String,
    pub tknx: String,
    pub tkny: String,
    pub liquidity: f64,
    pub price: f64, // current marginal price, tkny per tknx
    pub p_lo: f64,
    pub p_hi: f64,
}

impl ConcentratedCurve {
    pub fn new(
        cid: &str,
        tknx: &str,
        tkny: &str,
        liquidity: f64,
        price: f64,
        p_lo: f64,
        p_hi: f64,
    ) -> Result<Self, CurveError> {
        let c = ConcentratedCurve {
            cid: cid.to_string(),
            tknx: tknx.to_string(),
            tkny: tkny.to_string(),
            liquidity,
            price,
            p_lo,
            p_hi,
        };
        c.validate()?;
        Ok(c)
    }

    /// Position holding only tknx; sells it for tkny as the price rises
    /// from `p_lo` to `p_hi`.
    pub fn sell_x_order(
        cid: &str,
        tknx: &str,
        tkny: &str,
        amount_x: f64,
        p_lo: f64,
        p_hi: f64,
    ) -> Result<Self, CurveError> {
        ensure_positive(cid, "amount_x", amount_x)?;
        Self::check_bounds(cid, p_lo, p_hi)?;
        let liquidity = amount_x / (1.0 / p_lo.sqrt() - 1.0 / p_hi.sqrt());
        Self::new(cid, tknx, tkny, liquidity, p_lo, p_lo, p_hi)
    }

    /// Position holding only tkny; buys tknx with it as the price falls
    /// from `p_hi` to `p_lo`.
    pub fn buy_x_order(
        cid: &str,
        tknx: &str,
        tkny: &str,
        amount_y: f64,
        p_lo: f64,
        p_hi: f64,
    ) -> Result<Self, CurveError> {
        ensure_positive(cid, "amount_y", amount_y)?;
        Self::check_bounds(cid, p_lo, p_hi)?;
        let liquidity = amount_y / (p_hi.sqrt() - p_lo.sqrt());
        Self::new(cid, tknx, tkny, liquidity, p_hi, p_lo, p_hi)
    }

    fn check_bounds(cid: &str, p_lo: f64, p_hi: f64) -> Result<(), CurveError> {
        ensure_positive(cid, "p_lo", p_lo)?;
        ensure_positive(cid, "p_hi", p_hi)?;
        if p_hi <= p_lo {
            return Err(CurveError::PriceOutOfRange {
                cid: cid.to_string(),
                price: p_hi,
                lo: p_lo,
                hi: p_hi,
            });
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CurveError> {
        ensure_distinct(&self.cid, &self.tknx, &self.tkny)?;
        ensure_positive(&self.cid, "liquidity", self.liquidity)?;
        ensure_positive(&self.cid, "price", self.price)?;
        Self::check_bounds(&self.cid, self.p_lo, self.p_hi)?;
        if self.price < self.p_lo || self.price > self.p_hi {
            return Err(CurveError::PriceOutOfRange {
                cid: self.cid.clone(),
                price: self.price,
                lo: self.p_lo,
                hi: self.p_hi,
            });
        }
        Ok(())
    }

    /// Actual (non-virtual) token holdings at price `q`, clamped to the range.
    pub fn real_reserves_at_price(&self, q: f64) -> (f64, f64) {
        let s = q.clamp(self.p_lo, self.p_hi).sqrt();
        let l = self.liquidity;
        (l * (1.0 / s - 1.0 / self.p_hi.sqrt()), l * (s - self.p_lo.sqrt()))
    }
}

impl Curve for ConcentratedCurve {
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
        self.price
    }

    fn flow_from_price(&self, p: f64) -> (f64, f64) {
        let s0 = self.price.sqrt();
        let s1 = p.clamp(self.p_lo, self.p_hi).sqrt();
        let l = self.liquidity;
        (l * (1.0 / s1 - 1.0 / s0), l * (s1 - s0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> ConcentratedCurve {
        ConcentratedCurve::new("v3", "ETH", "USDC", 5_000.0, 3_500.0, 3_000.0, 4_000.0)
            .expect("valid position")
    }

    #[test]
    fn test_flow_matches_reserve_difference() {
        let c = position();
        let (x0, y0) = c.real_reserves_at_price(c.price);
        let (x1, y1) = c.real_reserves_at_price(3_700.0);
        let (dx, dy) = c.flow_from_price(3_700.0);
        assert!((dx - (x1 - x0)).abs() < 1e-9);
        assert!((dy - (y1 - y0)).abs() < 1e-6);
    }

    #[test]
    fn test_flow_saturates_outside_range() {
        let c = position();
        let (dx_edge, dy_edge) = c.flow_from_price(4_000.0);
        let (dx_far, dy_far) = c.flow_from_price(9_000.0);
        assert_eq!(dx_edge, dx_far);
        assert_eq!(dy_edge, dy_far);
        // all ETH gone at the top of the range
        let (x0, _) = c.real_reserves_at_price(c.price);
        assert!((dx_far + x0).abs() < 1e-9);
    }

    #[test]
    fn test_sell_order_only_trades_upwards() {
        let c = ConcentratedCurve::sell_x_order("lo", "ETH", "USDC", 2.0, 3_600.0, 3_700.0)
            .expect("valid order");
        assert_eq!(c.flow_from_price(3_500.0), (0.0, 0.0));
        let (dx, dy) = c.flow_from_price(3_700.0);
        assert!((dx + 2.0).abs() < 1e-9);
        // filled somewhere between the two bounds
        assert!(dy > 2.0 * 3_600.0 && dy < 2.0 * 3_700.0);
    }

    #[test]
    fn test_buy_order_only_trades_downwards() {
        let c = ConcentratedCurve::buy_x_order("bid", "ETH", "USDC", 7_000.0, 3_400.0, 3_500.0)
            .expect("valid order");
        assert_eq!(c.flow_from_price(3_600.0), (0.0, 0.0));
        let (dx, dy) = c.flow_from_price(3_400.0);
        assert!(dx > 0.0);
        assert!((dy + 7_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_price_outside_range() {
        let err = ConcentratedCurve::new("v3", "ETH", "USDC", 1.0, 5_000.0, 3_000.0, 4_000.0);
        assert!(matches!(err, Err(CurveError::PriceOutOfRange { .. })));
    }
}
