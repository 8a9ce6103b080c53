use thiserror::Error;

use crate::math::CurveError;

/// Structural misuse of the optimizer. Always surfaced, never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("need at least 2 curves for an arbitrage, got {0}")]
    InsufficientCurves(usize),
    #[error("target token {0} is not traded by any curve")]
    UnknownTargetToken(String),
    #[error("self-financing constraint needs exactly one optimization variable, found {0}")]
    OptimizationVariableCount(usize),
    #[error("self-financing constraint references token {0} outside the curve universe")]
    ConstraintTokenOutsideUniverse(String),
    #[error("fixed flow for {token} must be finite (got {value})")]
    NonFiniteConstraint { token: String, value: f64 },
    #[error("start price missing for tokens: {}", .0.join(", "))]
    MissingStartPrice(Vec<String>),
    #[error("start price table is keyed by {column} but the target token is {target}")]
    StartPriceColumnMismatch { column: String, target: String },
    #[error("start price table is keyed by {column} but lists it at {value}, expected 1")]
    ContradictoryStartPrice { column: String, value: f64 },
    #[error("start price for {token} must be finite and > 0 (got {value})")]
    InvalidStartPrice { token: String, value: f64 },
    #[error("absolute convergence needs a start price for unit token {0}")]
    MissingConvergenceUnit(String),
    #[error("tokens not connected to the target through any curve: {}", .0.join(", "))]
    DisconnectedTokens(Vec<String>),
    #[error("invalid optimizer setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error(transparent)]
    Curve(#[from] CurveError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceFailure {
    MaxIterations,
    NonFinite,
    /// step settled but non-target flows did not (flat or dead Jacobian rows)
    Stalled,
}

/// Expected runtime outcome: the Newton loop did not settle.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("optimizer did not converge after {iterations} iterations ({kind:?}, criterion {criterion:e} vs threshold {threshold:e})")]
pub struct ConvergenceError {
    pub kind: ConvergenceFailure,
    pub iterations: usize,
    pub criterion: f64,
    pub threshold: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Convergence(#[from] ConvergenceError),
}
