// Start prices
// ------------
// Newton needs a starting point. Either the caller hands one in (`StartPrice`)
// or we triangulate one from the curves' own marginal prices.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::math::{Curve, PriceMap};

use super::container::CurveContainer;
use super::error::ParameterError;

/// Caller-supplied starting prices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartPrice {
    /// Single-column table: prices of every token in units of `column`,
    /// which must be the target token.
    Table { column: String, prices: PriceMap },
    /// token -> price in any common numeraire (USD, ETH, ...). Must cover the
    /// target token too; everything is rescaled by its price.
    Map(PriceMap),
}

impl StartPrice {
    /// Prices in target units for every token of `universe`.
    pub fn resolve(
        &self,
        target: &str,
        universe: &BTreeSet<String>,
    ) -> Result<PriceMap, ParameterError> {
        let (raw, scale) = match self {
            StartPrice::Table { column, prices } => {
                if column != target {
                    return Err(ParameterError::StartPriceColumnMismatch {
                        column: column.clone(),
                        target: target.to_string(),
                    });
                }
                if let Some(own) = prices.get(column) {
                    if (own - 1.0).abs() > 1e-12 {
                        return Err(ParameterError::ContradictoryStartPrice {
                            column: column.clone(),
                            value: *own,
                        });
                    }
                }
                (prices, 1.0)
            }
            StartPrice::Map(prices) => {
                let p_target = *prices
                    .get(target)
                    .ok_or_else(|| ParameterError::MissingStartPrice(vec![target.to_string()]))?;
                check_price(target, p_target)?;
                (prices, p_target)
            }
        };

        let missing: Vec<String> = universe
            .iter()
            .filter(|t| *t != target && !raw.contains_key(*t))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ParameterError::MissingStartPrice(missing));
        }

        let mut out = PriceMap::new();
        for (token, price) in raw {
            if token == target {
                continue;
            }
            check_price(token, *price)?;
            out.insert(token.clone(), price / scale);
        }
        out.insert(target.to_string(), 1.0);
        Ok(out)
    }
}

fn check_price(token: &str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::InvalidStartPrice { token: token.to_string(), value })
    }
}

/// Source of starting prices when the caller does not provide any.
pub trait PriceEstimator {
    /// Prices of every token of the container, in `target` units.
    fn estimate<C: Curve>(
        &self,
        curves: &CurveContainer<C>,
        target: &str,
    ) -> Result<PriceMap, ParameterError>;
}

/// Walks the pair graph outwards from the target, pricing each newly reached
/// token off the geometric mean of the curve prices on the connecting pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct TriangulatedPriceEstimator;

impl PriceEstimator for TriangulatedPriceEstimator {
    fn estimate<C: Curve>(
        &self,
        curves: &CurveContainer<C>,
        target: &str,
    ) -> Result<PriceMap, ParameterError> {
        // (from, to) -> log10 of "to per from" summed over curves, and count
        let mut edges: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
        for c in curves.iter() {
            let p = c.price();
            if !(p.is_finite() && p > 0.0) {
                continue;
            }
            let lp = p.log10();
            let fwd = edges.entry((c.tknx().to_string(), c.tkny().to_string())).or_insert((0.0, 0));
            fwd.0 += lp;
            fwd.1 += 1;
            let rev = edges.entry((c.tkny().to_string(), c.tknx().to_string())).or_insert((0.0, 0));
            rev.0 -= lp;
            rev.1 += 1;
        }

        let mut adjacency: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
        for ((from, to), (sum, n)) in &edges {
            adjacency.entry(from.as_str()).or_default().push((to.as_str(), sum / *n as f64));
        }

        // log10 price in target units
        let mut known: BTreeMap<String, f64> = BTreeMap::new();
        known.insert(target.to_string(), 0.0);
        let mut queue = VecDeque::from([target.to_string()]);
        while let Some(token) = queue.pop_front() {
            let lp_token = known[&token];
            for (next, lp_next_per_token) in adjacency.get(token.as_str()).into_iter().flatten() {
                if known.contains_key(*next) {
                    continue;
                }
                // price[token]/price[next] = next per token
                known.insert(next.to_string(), lp_token - lp_next_per_token);
                queue.push_back(next.to_string());
            }
        }

        let unreached: Vec<String> = curves
            .tokens()
            .into_iter()
            .filter(|t| !known.contains_key(t))
            .collect();
        if !unreached.is_empty() {
            return Err(ParameterError::DisconnectedTokens(unreached));
        }

        Ok(known.into_iter().map(|(t, lp)| (t, 10f64.powf(lp))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ConstantProductCurve;

    fn universe(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_map_rescales_to_target() {
        let mut usd = PriceMap::new();
        usd.insert("WETH".to_string(), 2_000.0);
        usd.insert("USDC".to_string(), 1.0);
        usd.insert("WBTC".to_string(), 40_000.0);
        let p = StartPrice::Map(usd)
            .resolve("WETH", &universe(&["WETH", "USDC", "WBTC"]))
            .expect("resolved");
        assert_eq!(p["WETH"], 1.0);
        assert!((p["USDC"] - 0.0005).abs() < 1e-15);
        assert!((p["WBTC"] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_map_reports_missing_tokens() {
        let mut usd = PriceMap::new();
        usd.insert("WETH".to_string(), 2_000.0);
        let err = StartPrice::Map(usd).resolve("WETH", &universe(&["WETH", "USDC", "DAI"]));
        assert_eq!(
            err,
            Err(ParameterError::MissingStartPrice(vec!["DAI".to_string(), "USDC".to_string()]))
        );
    }

    #[test]
    fn test_table_column_must_be_target() {
        let mut prices = PriceMap::new();
        prices.insert("USDC".to_string(), 0.0005);
        let table = StartPrice::Table { column: "USDC".to_string(), prices: prices.clone() };
        assert!(matches!(
            table.resolve("WETH", &universe(&["WETH", "USDC"])),
            Err(ParameterError::StartPriceColumnMismatch { .. })
        ));

        let table = StartPrice::Table { column: "WETH".to_string(), prices };
        let p = table.resolve("WETH", &universe(&["WETH", "USDC"])).expect("resolved");
        assert_eq!(p["USDC"], 0.0005);
    }

    #[test]
    fn test_table_must_price_its_column_at_one() {
        let mut prices = PriceMap::new();
        prices.insert("USDC".to_string(), 0.0005);
        prices.insert("WETH".to_string(), 1.0);
        let table = StartPrice::Table { column: "WETH".to_string(), prices: prices.clone() };
        assert!(table.resolve("WETH", &universe(&["WETH", "USDC"])).is_ok());

        prices.insert("WETH".to_string(), 2_000.0);
        let table = StartPrice::Table { column: "WETH".to_string(), prices };
        assert_eq!(
            table.resolve("WETH", &universe(&["WETH", "USDC"])),
            Err(ParameterError::ContradictoryStartPrice { column: "WETH".to_string(), value: 2_000.0 })
        );
    }

    #[test]
    fn test_untagged_serde_forms() {
        let table: StartPrice = serde_json::from_value(serde_json::json!({
            "column": "WETH",
            "prices": {"USDC": 0.0005}
        }))
        .expect("table form");
        assert!(matches!(table, StartPrice::Table { .. }));

        let map: StartPrice = serde_json::from_value(serde_json::json!({"WETH": 2000.0, "USDC": 1.0}))
            .expect("map form");
        assert!(matches!(map, StartPrice::Map(_)));
    }

    #[test]
    fn test_triangulated_estimate() {
        let curves: CurveContainer<ConstantProductCurve> = vec![
            ConstantProductCurve::from_price("a", "WETH", "USDC", 2_000.0, 10.0),
            ConstantProductCurve::from_price("b", "WETH", "USDC", 2_020.0, 10.0),
            ConstantProductCurve::from_price("c", "WBTC", "USDC", 40_000.0, 1.0),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("valid")
        .into_iter()
        .collect();

        let p = TriangulatedPriceEstimator.estimate(&curves, "WETH").expect("estimate");
        let mid = (2_000.0f64 * 2_020.0).sqrt();
        assert_eq!(p["WETH"], 1.0);
        assert!((p["USDC"] - 1.0 / mid).abs() < 1e-12);
        assert!((p["WBTC"] - 40_000.0 / mid).abs() < 1e-8);
    }

    #[test]
    fn test_triangulated_rejects_disconnected() {
        let curves: CurveContainer<ConstantProductCurve> = vec![
            ConstantProductCurve::from_price("a", "WETH", "USDC", 2_000.0, 10.0),
            ConstantProductCurve::from_price("b", "DAI", "FRAX", 1.0, 10.0),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("valid")
        .into_iter()
        .collect();

        assert_eq!(
            TriangulatedPriceEstimator.estimate(&curves, "WETH"),
            Err(ParameterError::DisconnectedTokens(vec!["DAI".to_string(), "FRAX".to_string()]))
        );
    }
}
