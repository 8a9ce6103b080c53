// Aggregate flow function (dtkn_from_price)
// -----------------------------------------
// Maps a price vector over the non-target tokens to the summed pool flows of
// every token. Its root over the non-target coordinates is the arbitrage
// equilibrium. Prices are log10 by default: the ratios we care about span many
// orders of magnitude and the Newton step is far better scaled in log space.

use std::collections::BTreeMap;

use nalgebra::DVector;

use crate::math::{Curve, PriceMap};

use super::container::{CurveContainer, PairGrouping, TokenIndex};
use super::error::ParameterError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceScale {
    Log10,
    Linear,
}

pub struct FlowFunction<'a, C> {
    curves: &'a CurveContainer<C>,
    index: &'a TokenIndex,
    pairs: PairGrouping,
    universe: Vec<String>,
}

impl<'a, C: Curve> FlowFunction<'a, C> {
    pub fn new(curves: &'a CurveContainer<C>, index: &'a TokenIndex) -> Self {
        FlowFunction {
            curves,
            index,
            pairs: curves.pairs(),
            universe: curves.tokens().into_iter().collect(),
        }
    }

    /// Linear prices in target units, target included at exactly 1.
    pub fn price_map(&self, p: &DVector<f64>, scale: PriceScale) -> PriceMap {
        let mut prices: PriceMap = self
            .index
            .tokens()
            .iter()
            .zip(p.iter())
            .map(|(t, v)| {
                let linear = match scale {
                    PriceScale::Log10 => 10f64.powf(*v),
                    PriceScale::Linear => *v,
                };
                (t.clone(), linear)
            })
            .collect();
        prices.insert(self.index.target().to_string(), 1.0);
        prices
    }

    /// Net pool flow of every token in the universe (target included).
    pub fn flows_at(&self, prices: &PriceMap) -> Result<BTreeMap<String, f64>, ParameterError> {
        self.accumulate(prices, |v| v)
    }

    /// Sum of |flow| per token over all curves: how much of each token the
    /// curves move at `prices`, regardless of direction.
    pub fn gross_flows_at(&self, prices: &PriceMap) -> Result<BTreeMap<String, f64>, ParameterError> {
        self.accumulate(prices, f64::abs)
    }

    fn accumulate(
        &self,
        prices: &PriceMap,
        map: impl Fn(f64) -> f64,
    ) -> Result<BTreeMap<String, f64>, ParameterError> {
        let mut acc: BTreeMap<String, f64> =
            self.universe.iter().map(|t| (t.clone(), 0.0)).collect();

        for (_, members) in self.pairs.iter() {
            for &i in members {
                let Some(curve) = self.curves.get(i) else { continue };
                let flows = curve.flow_vector_from_price_vector(prices).ok_or_else(|| {
                    let missing = curve
                        .tokens()
                        .iter()
                        .filter(|t| !prices.contains_key(**t))
                        .map(|t| t.to_string())
                        .collect();
                    ParameterError::MissingStartPrice(missing)
                })?;
                for (token, dflow) in flows {
                    if let Some(slot) = acc.get_mut(token) {
                        *slot += map(dflow);
                    }
                }
            }
        }
        Ok(acc)
    }

    /// Map form of `dtkn_from_price`: every token's aggregate flow.
    pub fn dtkn_map(
        &self,
        p: &DVector<f64>,
        scale: PriceScale,
    ) -> Result<BTreeMap<String, f64>, ParameterError> {
        self.flows_at(&self.price_map(p, scale))
    }

    /// Vector form: aggregate flows of the non-target tokens in index order.
    pub fn dtkn_from_price(
        &self,
        p: &DVector<f64>,
        scale: PriceScale,
    ) -> Result<DVector<f64>, ParameterError> {
        let flows = self.dtkn_map(p, scale)?;
        Ok(DVector::from_iterator(
            self.index.len(),
            self.index
                .tokens()
                .iter()
                .map(|t| flows.get(t).copied().unwrap_or(0.0)),
        ))
    }
}
