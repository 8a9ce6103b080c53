// src/engine/optimizer.rs
// ============================================================================
// Marginal-price arbitrage optimizer.
//
// Finds the price vector (in target-token units) at which the summed pool
// flows of every non-target token vanish. At that point no riskless profit is
// left, and what the pools pay out in the target token is the arbitrage.
//
//   F(p) = sum over curves of flow(p)   (non-target tokens, log10 prices)
//   Newton: J(p) * dp = -F(p),  p <- p + dp
//
// J comes from forward differences. A singular J is an expected case (tokens
// whose curves sit outside their range, duplicate curves, ...) and drops to an
// SVD least-squares step.
//
// This file is sync (no RPC); you feed it a curve snapshot from your data layer.
//

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::math::{Curve, PriceMap};

use super::constraint::SelfFinancingConstraint;
use super::container::{CurveContainer, TokenIndex};
use super::convergence::{ConvergenceEvaluator, ConvergenceMode, Norm};
use super::error::{ConvergenceError, ConvergenceFailure, OptimizerError, ParameterError};
use super::flow::{FlowFunction, PriceScale};
use super::jacobian::{all_finite, forward_difference, solve_step, DEFAULT_JAC_H};
use super::pricing::{PriceEstimator, StartPrice, TriangulatedPriceEstimator};
use super::result::{Convergence, IterationRecord, OptimizerResult};

/// Knobs for one optimize() call. Field aliases accept the legacy names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    #[serde(alias = "maxiter")]
    pub max_iter: usize,
    /// relative criterion: norm of the log10 price step
    #[serde(alias = "eps")]
    pub epsr: f64,
    /// absolute criterion: norm of residual flows valued in `epsa_unit`
    pub epsa: f64,
    #[serde(alias = "epsaunit")]
    pub epsa_unit: Option<String>,
    pub norm: Norm,
    pub mode: ConvergenceMode,
    #[serde(alias = "jach")]
    pub jac_h: f64,
    /// return Err on non-convergence instead of OptimizerResult::Failed
    #[serde(alias = "raiseonerror")]
    pub raise_on_error: bool,
    /// flows at or below this are "no trade"
    pub trade_epsilon: f64,
    pub record_history: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_iter: 50,
            epsr: 1e-6,
            epsa: 1.0,
            epsa_unit: None,
            norm: Norm::L2,
            mode: ConvergenceMode::Relative,
            jac_h: DEFAULT_JAC_H,
            raise_on_error: false,
            trade_epsilon: 1e-10,
            record_history: false,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        let positive = |name: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ParameterError::InvalidSetting { name, reason: format!("must be > 0, got {}", v) })
            }
        };
        if self.max_iter == 0 {
            return Err(ParameterError::InvalidSetting {
                name: "max_iter",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("epsr", self.epsr)?;
        positive("epsa", self.epsa)?;
        positive("jac_h", self.jac_h)?;
        if !(self.trade_epsilon.is_finite() && self.trade_epsilon >= 0.0) {
            return Err(ParameterError::InvalidSetting {
                name: "trade_epsilon",
                reason: format!("must be >= 0, got {}", self.trade_epsilon),
            });
        }
        if self.mode == ConvergenceMode::Absolute && self.epsa_unit.is_none() {
            return Err(ParameterError::InvalidSetting {
                name: "epsa_unit",
                reason: "absolute convergence needs a unit token".to_string(),
            });
        }
        Ok(())
    }
}

/// Solver over one curve snapshot. Cheap to build; holds no state between
/// calls, so one instance per worker is the natural unit of parallelism.
pub struct MargPOptimizer<'a, C> {
    curves: &'a CurveContainer<C>,
    config: OptimizerConfig,
}

impl<'a, C: Curve> MargPOptimizer<'a, C> {
    pub fn new(curves: &'a CurveContainer<C>, config: OptimizerConfig) -> Self {
        MargPOptimizer { curves, config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Pure arbitrage on `target`, start prices triangulated unless given.
    pub fn optimize(
        &self,
        target: &str,
        pstart: Option<&StartPrice>,
    ) -> Result<OptimizerResult, OptimizerError> {
        self.optimize_with(&SelfFinancingConstraint::arb(target), pstart, &TriangulatedPriceEstimator)
    }

    pub fn optimize_with<E: PriceEstimator>(
        &self,
        sfc: &SelfFinancingConstraint,
        pstart: Option<&StartPrice>,
        estimator: &E,
    ) -> Result<OptimizerResult, OptimizerError> {
        // ---- Initializing ----
        self.config.validate()?;
        if self.curves.len() < 2 {
            return Err(ParameterError::InsufficientCurves(self.curves.len()).into());
        }
        let universe = self.curves.tokens();
        sfc.check_universe(&universe)?;
        let target = sfc.optimization_variable();
        let index = TokenIndex::new(&universe, target)?;

        let start = match pstart {
            Some(sp) => sp.resolve(target, &universe)?,
            None => estimator.estimate(self.curves, target)?,
        };
        let evaluator = self.evaluator(&start)?;

        let flow = FlowFunction::new(self.curves, &index);
        let fixed = DVector::from_iterator(index.len(), index.tokens().iter().map(|t| sfc.get(t)));
        let residual_at = |p: &DVector<f64>| -> Result<DVector<f64>, ParameterError> {
            Ok(flow.dtkn_from_price(p, PriceScale::Log10)? - &fixed)
        };

        let mut p_log = DVector::from_iterator(
            index.len(),
            index.tokens().iter().map(|t| start[t].log10()),
        );
        log::debug!(
            "MargP start: target={} tokens={} pairs={} mode={:?} unit={:?} norm={}",
            target,
            index.len(),
            self.curves.pairs().len(),
            evaluator.mode(),
            evaluator.unit(),
            self.config.norm,
        );

        // ---- Iterating ----
        let mut history = Vec::new();
        let mut criterion = f64::INFINITY;
        for i in 0..self.config.max_iter {
            let residual = residual_at(&p_log)?;
            if !all_finite(residual.iter()) {
                return self.fail(ConvergenceFailure::NonFinite, i, criterion, &evaluator);
            }

            let jac = forward_difference(residual_at, &p_log, &residual, self.config.jac_h)?;
            if !all_finite(jac.iter()) {
                return self.fail(ConvergenceFailure::NonFinite, i, criterion, &evaluator);
            }
            let step = solve_step(&jac, &residual);
            if !all_finite(step.delta.iter()) {
                return self.fail(ConvergenceFailure::NonFinite, i, criterion, &evaluator);
            }

            let prices = p_log.map(|v| 10f64.powf(v));
            criterion = evaluator.measure(&step.delta, &residual, &prices);
            p_log = &p_log + &step.delta;

            let max_abs_residual = residual.amax();
            log::debug!(
                "MargP iter {}: criterion={:e} max|dtkn|={:e} lstsq={}",
                i,
                criterion,
                max_abs_residual,
                step.least_squares,
            );
            if self.config.record_history {
                history.push(IterationRecord {
                    iteration: i,
                    criterion,
                    least_squares: step.least_squares,
                    max_abs_residual,
                });
            }

            // iteration 0 only establishes a baseline from the start estimate
            if i > 0 && evaluator.is_satisfied(criterion) {
                let prices = flow.price_map(&p_log, PriceScale::Log10);
                let flows = flow.flows_at(&prices)?;

                // a zero step on a flat Jacobian row is not a root
                let gross = flow.gross_flows_at(&prices)?;
                let tokens = index.tokens();
                let leftover = DVector::from_iterator(
                    index.len(),
                    tokens.iter().map(|t| flows.get(t).copied().unwrap_or(0.0) - sfc.get(t)),
                );
                let scale = DVector::from_iterator(
                    index.len(),
                    tokens.iter().enumerate().map(|(k, t)| {
                        gross.get(t).copied().unwrap_or(0.0)
                            + sfc.get(t).abs()
                            + jac.row(k).iter().map(|v| v.abs()).sum::<f64>()
                    }),
                );
                let final_prices = p_log.map(|v| 10f64.powf(v));
                if !evaluator.residual_settled(&leftover, &final_prices, &scale) {
                    log::debug!(
                        "MargP stalled at iter {}: step settled but max|dtkn|={:e}",
                        i,
                        leftover.amax()
                    );
                    return self.fail(ConvergenceFailure::Stalled, i + 1, criterion, &evaluator);
                }

                // ---- Converged ----
                log::debug!("MargP converged after {} iterations", i + 1);
                return Ok(OptimizerResult::Converged(Convergence {
                    target: target.to_string(),
                    tokens: index.tokens().to_vec(),
                    price_log10: p_log,
                    prices,
                    flows,
                    iterations: i + 1,
                    criterion,
                    trade_epsilon: self.config.trade_epsilon,
                    history,
                }));
            }
        }

        // ---- Failed ----
        self.fail(ConvergenceFailure::MaxIterations, self.config.max_iter, criterion, &evaluator)
    }

    fn evaluator(&self, start: &PriceMap) -> Result<ConvergenceEvaluator, ParameterError> {
        match self.config.mode {
            ConvergenceMode::Relative => {
                Ok(ConvergenceEvaluator::relative(self.config.epsr, self.config.norm))
            }
            ConvergenceMode::Absolute => {
                let unit = self.config.epsa_unit.as_deref().unwrap_or_default();
                let p_unit = start
                    .get(unit)
                    .copied()
                    .ok_or_else(|| ParameterError::MissingConvergenceUnit(unit.to_string()))?;
                Ok(ConvergenceEvaluator::absolute(self.config.epsa, unit, p_unit, self.config.norm))
            }
        }
    }

    fn fail(
        &self,
        kind: ConvergenceFailure,
        iterations: usize,
        criterion: f64,
        evaluator: &ConvergenceEvaluator,
    ) -> Result<OptimizerResult, OptimizerError> {
        let err = ConvergenceError { kind, iterations, criterion, threshold: evaluator.threshold() };
        log::debug!("MargP failed: {}", err);
        if self.config.raise_on_error {
            Err(err.into())
        } else {
            Ok(OptimizerResult::Failed(err))
        }
    }
}
