// Convergence criteria
// --------------------
// Relative: size of the last log10 price step.
// Absolute: size of the residual flows valued in a unit token (e.g. a
//           stablecoin), so the threshold reads as "$ of residual mispricing".
// The norm is an independent knob.

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Norm {
    #[serde(alias = "l1")]
    L1,
    #[default]
    #[serde(alias = "l2")]
    L2,
    #[serde(alias = "linf", alias = "LINF", alias = "max")]
    Linf,
}

impl Norm {
    pub fn apply(&self, v: &DVector<f64>) -> f64 {
        match self {
            Norm::L1 => v.iter().map(|x| x.abs()).sum(),
            Norm::L2 => v.norm(),
            Norm::Linf => v.iter().fold(0.0, |m, x| m.max(x.abs())),
        }
    }
}

impl FromStr for Norm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l1" => Ok(Norm::L1),
            "l2" => Ok(Norm::L2),
            "linf" | "max" => Ok(Norm::Linf),
            other => Err(format!("unknown norm '{}', expected L1, L2 or Linf", other)),
        }
    }
}

impl fmt::Display for Norm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Norm::L1 => "L1",
            Norm::L2 => "L2",
            Norm::Linf => "Linf",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceMode {
    #[default]
    Relative,
    Absolute,
}

impl FromStr for ConvergenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relative" | "rel" => Ok(ConvergenceMode::Relative),
            "absolute" | "abs" => Ok(ConvergenceMode::Absolute),
            other => Err(format!("unknown convergence mode '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Criterion {
    Relative { epsr: f64 },
    Absolute { epsa: f64, unit: String, p_unit: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConvergenceEvaluator {
    criterion: Criterion,
    norm: Norm,
}

impl ConvergenceEvaluator {
    pub fn relative(epsr: f64, norm: Norm) -> Self {
        ConvergenceEvaluator { criterion: Criterion::Relative { epsr }, norm }
    }

    /// `p_unit` is the unit token's price in target-token units, fixed for the
    /// whole run.
    pub fn absolute(epsa: f64, unit: &str, p_unit: f64, norm: Norm) -> Self {
        ConvergenceEvaluator {
            criterion: Criterion::Absolute { epsa, unit: unit.to_string(), p_unit },
            norm,
        }
    }

    pub fn threshold(&self) -> f64 {
        match &self.criterion {
            Criterion::Relative { epsr } => *epsr,
            Criterion::Absolute { epsa, .. } => *epsa,
        }
    }

    pub fn mode(&self) -> ConvergenceMode {
        match self.criterion {
            Criterion::Relative { .. } => ConvergenceMode::Relative,
            Criterion::Absolute { .. } => ConvergenceMode::Absolute,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match &self.criterion {
            Criterion::Absolute { unit, .. } => Some(unit),
            Criterion::Relative { .. } => None,
        }
    }

    /// `residual` and `prices` (linear, target units) must come from the same
    /// evaluation point; `delta_log` is the step taken from that point.
    pub fn measure(
        &self,
        delta_log: &DVector<f64>,
        residual: &DVector<f64>,
        prices: &DVector<f64>,
    ) -> f64 {
        match &self.criterion {
            Criterion::Relative { .. } => self.norm.apply(delta_log),
            Criterion::Absolute { p_unit, .. } => {
                let in_unit = residual.component_mul(prices) / *p_unit;
                self.norm.apply(&in_unit)
            }
        }
    }

    pub fn is_satisfied(&self, criterion: f64) -> bool {
        criterion < self.threshold()
    }

    /// Second gate after `is_satisfied`: the flows left at the returned
    /// prices must be negligible as well. A flat Jacobian row yields a zero
    /// step without reaching a root.
    ///
    /// `scale[i]` is the size of token i's flows (gross curve flows plus the
    /// Jacobian row mass). Relative mode allows `sqrt(epsr)` of it; absolute
    /// mode reuses `epsa` on the residual valued in the unit token.
    pub fn residual_settled(
        &self,
        residual: &DVector<f64>,
        prices: &DVector<f64>,
        scale: &DVector<f64>,
    ) -> bool {
        match &self.criterion {
            Criterion::Relative { epsr } => {
                let tol = epsr.sqrt();
                residual.iter().zip(scale.iter()).all(|(r, s)| r.abs() <= tol * s)
            }
            Criterion::Absolute { epsa, p_unit, .. } => {
                let in_unit = residual.component_mul(prices) / *p_unit;
                self.norm.apply(&in_unit) <= *epsa
            }
        }
    }
}
