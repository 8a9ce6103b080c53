// Trade instructions
// ------------------
// Turns converged prices back into per-curve trades. Amounts follow the pool's
// point of view: amt_in > 0 goes into the curve, amt_out < 0 leaves it.

use serde::{Deserialize, Serialize};

use crate::math::{Curve, PriceMap};

use super::container::CurveContainer;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeInstruction {
    pub cid: String,
    pub tkn_in: String,
    pub amt_in: f64,
    pub tkn_out: String,
    pub amt_out: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TradeInstruction {
    /// Build from a curve's signed flows. Returns None when both sides are
    /// dust (no trade). A sign-convention violation still yields an
    /// instruction, zeroed and carrying the error.
    pub fn from_flows(
        cid: &str,
        tknx: &str,
        dx: f64,
        tkny: &str,
        dy: f64,
        epsilon: f64,
    ) -> Option<Self> {
        let x_dust = dx.abs() <= epsilon;
        let y_dust = dy.abs() <= epsilon;
        if x_dust && y_dust {
            return None;
        }

        let opposite = dx.is_finite() && dy.is_finite() && !x_dust && !y_dust && (dx > 0.0) != (dy > 0.0);
        if !opposite {
            log::warn!("Curve {} flows ({}, {}) violate the in/out sign convention", cid, dx, dy);
            return Some(TradeInstruction {
                cid: cid.to_string(),
                tkn_in: tknx.to_string(),
                amt_in: 0.0,
                tkn_out: tkny.to_string(),
                amt_out: 0.0,
                error: Some(format!(
                    "flows ({} {}, {} {}) do not have opposite signs",
                    dx, tknx, dy, tkny
                )),
            });
        }

        let ((tkn_in, amt_in), (tkn_out, amt_out)) = if dx > 0.0 {
            ((tknx, dx), (tkny, dy))
        } else {
            ((tkny, dy), (tknx, dx))
        };
        Some(TradeInstruction {
            cid: cid.to_string(),
            tkn_in: tkn_in.to_string(),
            amt_in,
            tkn_out: tkn_out.to_string(),
            amt_out,
            error: None,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Effective price of the trade, tkn_in per tkn_out.
    pub fn price_in_per_out(&self) -> Option<f64> {
        (self.amt_out != 0.0).then(|| -self.amt_in / self.amt_out)
    }
}

/// Re-evaluate every curve at `prices` (target units) and keep the ones that
/// actually trade.
pub fn extract_trade_instructions<C: Curve>(
    curves: &CurveContainer<C>,
    prices: &PriceMap,
    epsilon: f64,
) -> Vec<TradeInstruction> {
    curves
        .iter()
        .filter_map(|c| {
            let px = prices.get(c.tknx())?;
            let py = prices.get(c.tkny())?;
            let (dx, dy) = c.flow_from_price(px / py);
            TradeInstruction::from_flows(c.cid(), c.tknx(), dx, c.tkny(), dy, epsilon)
        })
        .collect()
}
