// Self-financing constraint
// -------------------------
// One token is the free optimization variable (the profit token); every other
// listed token has its aggregate pool flow pinned to a fixed amount. The pure
// arbitrage case pins everything else to zero and only needs the target.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::error::ParameterError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintEntry {
    OptimizationVariable,
    Fixed(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelfFinancingConstraint {
    target: String,
    fixed: BTreeMap<String, f64>,
}

impl SelfFinancingConstraint {
    /// Pure arbitrage: `target` is free, every other token nets to zero.
    pub fn arb(target: &str) -> Self {
        SelfFinancingConstraint { target: target.to_string(), fixed: BTreeMap::new() }
    }

    pub fn new(
        entries: BTreeMap<String, ConstraintEntry>,
        universe: &BTreeSet<String>,
    ) -> Result<Self, ParameterError> {
        let markers: Vec<&String> = entries
            .iter()
            .filter(|(_, e)| matches!(e, ConstraintEntry::OptimizationVariable))
            .map(|(t, _)| t)
            .collect();
        if markers.len() != 1 {
            return Err(ParameterError::OptimizationVariableCount(markers.len()));
        }
        let target = markers[0].clone();

        let mut fixed = BTreeMap::new();
        for (token, entry) in &entries {
            if let ConstraintEntry::Fixed(v) = entry {
                if !v.is_finite() {
                    return Err(ParameterError::NonFiniteConstraint { token: token.clone(), value: *v });
                }
                fixed.insert(token.clone(), *v);
            }
        }

        let sfc = SelfFinancingConstraint { target, fixed };
        sfc.check_universe(universe)?;
        Ok(sfc)
    }

    /// Every referenced token must be traded by some curve.
    pub fn check_universe(&self, universe: &BTreeSet<String>) -> Result<(), ParameterError> {
        if !universe.contains(&self.target) {
            return Err(ParameterError::UnknownTargetToken(self.target.clone()));
        }
        match self.fixed.keys().find(|t| !universe.contains(*t)) {
            Some(t) => Err(ParameterError::ConstraintTokenOutsideUniverse(t.clone())),
            None => Ok(()),
        }
    }

    pub fn optimization_variable(&self) -> &str {
        &self.target
    }

    /// The optimization variable counts as the one nonzero entry, so any
    /// nonzero fixed flow makes this a non-arbitrage constraint.
    pub fn is_arbitrage_only(&self) -> bool {
        self.fixed.values().all(|v| *v == 0.0)
    }

    pub fn get(&self, token: &str) -> f64 {
        self.fixed.get(token).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> BTreeSet<String> {
        ["WETH", "USDC", "DAI"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_arb_constructor() {
        let sfc = SelfFinancingConstraint::arb("WETH");
        assert_eq!(sfc.optimization_variable(), "WETH");
        assert!(sfc.is_arbitrage_only());
        assert_eq!(sfc.get("USDC"), 0.0);
        assert!(sfc.check_universe(&universe()).is_ok());
        assert_eq!(
            SelfFinancingConstraint::arb("LINK").check_universe(&universe()),
            Err(ParameterError::UnknownTargetToken("LINK".to_string()))
        );
    }

    #[test]
    fn test_explicit_entries() {
        let mut entries = BTreeMap::new();
        entries.insert("USDC".to_string(), ConstraintEntry::OptimizationVariable);
        entries.insert("DAI".to_string(), ConstraintEntry::Fixed(0.0));
        entries.insert("WETH".to_string(), ConstraintEntry::Fixed(-2.5));
        let sfc = SelfFinancingConstraint::new(entries, &universe()).expect("valid constraint");
        assert_eq!(sfc.optimization_variable(), "USDC");
        assert_eq!(sfc.get("WETH"), -2.5);
        assert!(!sfc.is_arbitrage_only());
    }

    #[test]
    fn test_marker_count_enforced() {
        let mut entries = BTreeMap::new();
        entries.insert("USDC".to_string(), ConstraintEntry::OptimizationVariable);
        entries.insert("WETH".to_string(), ConstraintEntry::OptimizationVariable);
        assert_eq!(
            SelfFinancingConstraint::new(entries, &universe()),
            Err(ParameterError::OptimizationVariableCount(2))
        );

        let mut entries = BTreeMap::new();
        entries.insert("USDC".to_string(), ConstraintEntry::Fixed(0.0));
        assert_eq!(
            SelfFinancingConstraint::new(entries, &universe()),
            Err(ParameterError::OptimizationVariableCount(0))
        );
    }

    #[test]
    fn test_token_outside_universe() {
        let mut entries = BTreeMap::new();
        entries.insert("USDC".to_string(), ConstraintEntry::OptimizationVariable);
        entries.insert("WBTC".to_string(), ConstraintEntry::Fixed(0.0));
        assert_eq!(
            SelfFinancingConstraint::new(entries, &universe()),
            Err(ParameterError::ConstraintTokenOutsideUniverse("WBTC".to_string()))
        );
    }
}
