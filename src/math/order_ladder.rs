// Discretized limit-order curve
// -----------------------------
// A book of resting orders on one pair, discretized into levels. Each ask
// level offers `amount` of tknx between the previous level's price and its
// own; each bid level buys `amount` of tknx the same way on the way down.
// Fills are linear in price inside a level, so the paid/received tkny is the
// exact trapezoid integral and the flow stays continuous in price.

use serde::{Deserialize, Serialize};

use super::{ensure_distinct, ensure_positive, Curve, CurveError};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LadderLevel {
    pub price: f64,
    pub amount: f64, // tknx
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderLadderCurve {
    pub cid: String,
    pub tknx: String,
    pub tkny: String,
    pub price: f64, // reference (mid) price
    #[serde(default)]
    pub asks: Vec<LadderLevel>, // ascending, all above `price`
    #[serde(default)]
    pub bids: Vec<LadderLevel>, // descending, all below `price`
}

impl OrderLadderCurve {
    pub fn new(
        cid: &str,
        tknx: &str,
        tkny: &str,
        price: f64,
        asks: Vec<LadderLevel>,
        bids: Vec<LadderLevel>,
    ) -> Result<Self, CurveError> {
        let c = OrderLadderCurve {
            cid: cid.to_string(),
            tknx: tknx.to_string(),
            tkny: tkny.to_string(),
            price,
            asks,
            bids,
        };
        c.validate()?;
        Ok(c)
    }

    pub fn validate(&self) -> Result<(), CurveError> {
        ensure_distinct(&self.cid, &self.tknx, &self.tkny)?;
        ensure_positive(&self.cid, "price", self.price)?;

        let mut prev = self.price;
        for lvl in &self.asks {
            ensure_positive(&self.cid, "ask amount", lvl.amount)?;
            if !(lvl.price > prev) || !lvl.price.is_finite() {
                return Err(self.unordered());
            }
            prev = lvl.price;
        }

        let mut prev = self.price;
        for lvl in &self.bids {
            ensure_positive(&self.cid, "bid amount", lvl.amount)?;
            if !(lvl.price < prev) || !(lvl.price > 0.0) {
                return Err(self.unordered());
            }
            prev = lvl.price;
        }
        Ok(())
    }

    fn unordered(&self) -> CurveError {
        CurveError::UnorderedLevels { cid: self.cid.clone(), reference: self.price }
    }

    /// Walk `levels` from the reference price towards `p`, returning
    /// (filled tknx, tkny value of the fill).
    fn fill(&self, levels: &[LadderLevel], p: f64) -> (f64, f64) {
        let mut prev = self.price;
        let mut filled = 0.0;
        let mut value = 0.0;
        for lvl in levels {
            let span = lvl.price - prev;
            let reached = (p - prev) / span; // same sign as span while p is beyond prev
            if reached >= 1.0 {
                filled += lvl.amount;
                value += lvl.amount * 0.5 * (prev + lvl.price);
                prev = lvl.price;
            } else {
                if reached > 0.0 {
                    let part = reached * lvl.amount;
                    filled += part;
                    value += part * 0.5 * (prev + p);
                }
                break;
            }
        }
        (filled, value)
    }

    pub fn total_ask(&self) -> f64 {
        self.asks.iter().map(|l| l.amount).sum()
    }

    pub fn total_bid(&self) -> f64 {
        self.bids.iter().map(|l| l.amount).sum()
    }
}

impl Curve for OrderLadderCurve {
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
        if p > self.price {
            let (sold, received) = self.fill(&self.asks, p);
            (-sold, received)
        } else if p < self.price {
            let (bought, paid) = self.fill(&self.bids, p);
            (bought, -paid)
        } else {
            (0.0, 0.0)
        }
    }
}
