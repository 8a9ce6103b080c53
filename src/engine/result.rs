use std::collections::BTreeMap;

use nalgebra::DVector;
use serde::Serialize;

use crate::math::{Curve, PriceMap};

use super::container::CurveContainer;
use super::error::ConvergenceError;
use super::trade::{extract_trade_instructions, TradeInstruction};

/// One Newton step, kept only when `record_history` is on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub criterion: f64,
    pub least_squares: bool,
    pub max_abs_residual: f64,
}

/// A solved arbitrage problem.
#[derive(Clone, Debug, PartialEq)]
pub struct Convergence {
    pub(crate) target: String,
    pub(crate) tokens: Vec<String>,
    pub(crate) price_log10: DVector<f64>,
    pub(crate) prices: PriceMap,
    pub(crate) flows: BTreeMap<String, f64>,
    pub(crate) iterations: usize,
    pub(crate) criterion: f64,
    pub(crate) trade_epsilon: f64,
    pub(crate) history: Vec<IterationRecord>,
}

impl Convergence {
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Non-target tokens in price-vector order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// log10 prices in target units, `tokens()` order.
    pub fn price_vector(&self) -> &DVector<f64> {
        &self.price_log10
    }

    /// Linear prices in target units, target included at 1.
    pub fn prices(&self) -> &PriceMap {
        &self.prices
    }

    /// Aggregate pool flow per token (pool perspective) at the final prices.
    pub fn flows(&self) -> &BTreeMap<String, f64> {
        &self.flows
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn criterion(&self) -> f64 {
        self.criterion
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// What the arbitrageur keeps in the target token.
    pub fn profit(&self) -> f64 {
        -self.flows.get(&self.target).copied().unwrap_or(0.0)
    }

    /// Largest leftover flow among the non-target tokens.
    pub fn max_residual(&self) -> f64 {
        self.flows
            .iter()
            .filter(|(t, _)| **t != self.target)
            .fold(0.0, |m, (_, v)| m.max(v.abs()))
    }

    /// Per-curve trades at the converged prices. `curves` must be the same
    /// snapshot the optimizer ran on.
    pub fn trade_instructions<C: Curve>(&self, curves: &CurveContainer<C>) -> Vec<TradeInstruction> {
        extract_trade_instructions(curves, &self.prices, self.trade_epsilon)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptimizerResult {
    Converged(Convergence),
    Failed(ConvergenceError),
}

impl OptimizerResult {
    pub fn is_converged(&self) -> bool {
        matches!(self, OptimizerResult::Converged(_))
    }

    pub fn converged(&self) -> Option<&Convergence> {
        match self {
            OptimizerResult::Converged(c) => Some(c),
            OptimizerResult::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ConvergenceError> {
        match self {
            OptimizerResult::Converged(_) => None,
            OptimizerResult::Failed(e) => Some(e),
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            OptimizerResult::Converged(c) => c.iterations,
            OptimizerResult::Failed(e) => e.iterations,
        }
    }
}
