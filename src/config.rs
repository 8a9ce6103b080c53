use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::engine::{ConvergenceMode, Norm, OptimizerConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_scan_candidates: usize,

    // Defaults for every optimize() call; requests may override per call
    pub optimizer: OptimizerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load configuration files (secrets first, then public config)
        dotenv::from_filename("secrets.env").ok();
        dotenv::from_filename("config/app.env").ok();
        dotenv::dotenv().ok();

        let defaults = OptimizerConfig::default();
        let optimizer = OptimizerConfig {
            max_iter: parse_or("OPTIMIZER_MAX_ITER", defaults.max_iter)?,
            epsr: parse_or("OPTIMIZER_EPSR", defaults.epsr)?,
            epsa: parse_or("OPTIMIZER_EPSA", defaults.epsa)?,
            epsa_unit: env::var("OPTIMIZER_EPSA_UNIT").ok().filter(|s| !s.trim().is_empty()),
            norm: parse_or::<Norm>("OPTIMIZER_NORM", defaults.norm)?,
            mode: parse_or::<ConvergenceMode>("OPTIMIZER_MODE", defaults.mode)?,
            jac_h: parse_or("OPTIMIZER_JAC_H", defaults.jac_h)?,
            trade_epsilon: parse_or("OPTIMIZER_TRADE_EPSILON", defaults.trade_epsilon)?,
            raise_on_error: false,
            record_history: false,
        };
        optimizer
            .validate()
            .context("invalid optimizer defaults in environment")?;

        Ok(Config {
            port: parse_or("PORT", 8000)?,
            max_scan_candidates: parse_or("MAX_SCAN_CANDIDATES", 256)?,
            optimizer,
        })
    }
}

/// Read `key` if set, else fall back. A set but unparsable value is an error.
fn parse_or<T>(key: &str, fallback: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} has invalid value '{}'", key, raw)),
        Err(_) => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_fallback_and_override() {
        env::remove_var("MARGP_TEST_UNSET");
        assert_eq!(parse_or("MARGP_TEST_UNSET", 7usize).expect("fallback"), 7);

        env::set_var("MARGP_TEST_NORM", "Linf");
        assert_eq!(parse_or("MARGP_TEST_NORM", Norm::L2).expect("parsed"), Norm::Linf);

        env::set_var("MARGP_TEST_BAD", "not-a-number");
        let err = parse_or("MARGP_TEST_BAD", 1.0f64).expect_err("bad value");
        assert!(err.to_string().contains("MARGP_TEST_BAD"));
    }
}
