// service.rs
// Candidate evaluation on top of the optimizer: single runs for the API and
// batch scans where a bad candidate just means "no opportunity here".

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::engine::container::CurveContainer;
use crate::engine::error::OptimizerError;
use crate::engine::optimizer::{MargPOptimizer, OptimizerConfig};
use crate::engine::result::OptimizerResult;
use crate::engine::trade::TradeInstruction;
use crate::math::{AnyCurve, PriceMap};
use crate::models::{ArbCandidate, ReportStatus};

#[derive(Clone, Debug, Serialize)]
pub struct OptimizationReport {
    pub timestamp_utc: String,
    pub id: Option<String>,
    pub target: String,
    pub status: ReportStatus,
    pub iterations: usize,
    pub profit: f64, // in target token
    pub prices: PriceMap, // target units
    pub flows: BTreeMap<String, f64>,
    pub trade_instructions: Vec<TradeInstruction>,
    pub error: Option<String>,
}

impl OptimizationReport {
    /// Report without a solution: no prices, flows or trades.
    pub(crate) fn empty(
        id: Option<String>,
        target: &str,
        status: ReportStatus,
        error: Option<String>,
    ) -> Self {
        OptimizationReport {
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            id,
            target: target.to_string(),
            status,
            iterations: 0,
            profit: 0.0,
            prices: PriceMap::new(),
            flows: BTreeMap::new(),
            trade_instructions: Vec::new(),
            error,
        }
    }

    pub fn is_opportunity(&self) -> bool {
        self.status == ReportStatus::Converged && self.profit > 0.0
    }
}

/// Run one candidate. Structural problems come back as `Err`.
pub fn run_candidate(
    candidate: &ArbCandidate,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, OptimizerError> {
    for curve in &candidate.curves {
        curve.validate().map_err(crate::engine::error::ParameterError::from)?;
    }
    let curves: CurveContainer<AnyCurve> = candidate.curves.iter().cloned().collect();

    let start = Instant::now();
    let result = MargPOptimizer::new(&curves, config.clone())
        .optimize(&candidate.target, candidate.pstart.as_ref())?;
    log::debug!(
        "Candidate {:?} ({} curves) solved in {:?}",
        candidate.id,
        curves.len(),
        start.elapsed()
    );

    let report = match result {
        OptimizerResult::Converged(conv) => OptimizationReport {
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            id: candidate.id.clone(),
            target: candidate.target.clone(),
            status: ReportStatus::Converged,
            iterations: conv.iterations(),
            profit: conv.profit(),
            trade_instructions: conv.trade_instructions(&curves),
            prices: conv.prices().clone(),
            flows: conv.flows().clone(),
            error: None,
        },
        OptimizerResult::Failed(err) => {
            let mut report = OptimizationReport::empty(
                candidate.id.clone(),
                &candidate.target,
                ReportStatus::Failed,
                Some(err.to_string()),
            );
            report.iterations = err.iterations;
            report
        }
    };
    Ok(report)
}

/// Like `run_candidate`, but never fails: misuse is reported as `Rejected`.
pub fn optimize_candidate(candidate: &ArbCandidate, config: &OptimizerConfig) -> OptimizationReport {
    match run_candidate(candidate, config) {
        Ok(report) => report,
        Err(e) => {
            log::warn!("Skipping candidate {:?}: {}", candidate.id, e);
            OptimizationReport::empty(
                candidate.id.clone(),
                &candidate.target,
                ReportStatus::Rejected,
                Some(e.to_string()),
            )
        }
    }
}

/// Evaluate candidates concurrently on the blocking pool, one optimize() per
/// worker. Opportunities come first, best profit first.
pub async fn scan_candidates(
    candidates: Vec<ArbCandidate>,
    config: OptimizerConfig,
) -> Vec<OptimizationReport> {
    let scan_start = Instant::now();
    let total = candidates.len();
    let config = Arc::new(config);

    let tasks = candidates.into_iter().map(|candidate| {
        let config = config.clone();
        tokio::task::spawn_blocking(move || optimize_candidate(&candidate, &config))
    });
    let joined = futures::future::join_all(tasks).await;

    let mut reports: Vec<OptimizationReport> = joined
        .into_iter()
        .filter_map(|r| match r {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("Candidate worker panicked: {}", e);
                None
            }
        })
        .collect();

    reports.sort_by(|a, b| {
        b.is_opportunity()
            .cmp(&a.is_opportunity())
            .then(b.profit.total_cmp(&a.profit))
    });

    let found = reports.iter().filter(|r| r.is_opportunity()).count();
    log::info!(
        "Scanned {} candidates in {:?}: {} opportunities",
        total,
        scan_start.elapsed(),
        found
    );
    reports
}
