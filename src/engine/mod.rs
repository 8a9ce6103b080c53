pub mod constraint;
pub mod container;
pub mod convergence;
pub mod error;
pub mod flow;
pub mod jacobian;
pub mod optimizer;
pub mod pricing;
pub mod result;
pub mod service;
pub mod trade;

pub use constraint::{ConstraintEntry, SelfFinancingConstraint};
pub use container::{CurveContainer, PairGrouping, TokenIndex};
pub use convergence::{ConvergenceEvaluator, ConvergenceMode, Norm};
pub use error::{ConvergenceError, ConvergenceFailure, OptimizerError, ParameterError};
pub use optimizer::{MargPOptimizer, OptimizerConfig};
pub use pricing::{PriceEstimator, StartPrice, TriangulatedPriceEstimator};
pub use result::{Convergence, IterationRecord, OptimizerResult};
pub use trade::TradeInstruction;
