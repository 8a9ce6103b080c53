use rocket::serde::{Deserialize, Serialize};

use crate::engine::pricing::StartPrice;
use crate::engine::service::OptimizationReport;
use crate::engine::OptimizerConfig;
use crate::math::AnyCurve;
use crate::models::ArbCandidate;

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct OptimizeRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub curves: Vec<AnyCurve>,
    pub target: String,
    #[serde(default)]
    pub pstart: Option<StartPrice>,
    #[serde(default)]
    pub params: Option<OptimizerConfig>,  // replaces server defaults as a whole
}

impl OptimizeRequest {
    pub fn into_parts(self, defaults: &OptimizerConfig) -> (ArbCandidate, OptimizerConfig) {
        let config = self.params.unwrap_or_else(|| defaults.clone());
        let candidate = ArbCandidate {
            id: self.id,
            curves: self.curves,
            target: self.target,
            pstart: self.pstart,
        };
        (candidate, config)
    }
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScanRequest {
    pub candidates: Vec<ArbCandidate>,
    #[serde(default)]
    pub params: Option<OptimizerConfig>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ScanResponse {
    pub timestamp_utc: String,
    pub scanned: usize,
    pub opportunities: usize,
    pub total_profit_by_target: std::collections::BTreeMap<String, f64>,
    pub reports: Vec<OptimizationReport>,
    pub error: Option<String>,
}

impl ScanResponse {
    pub fn from_reports(reports: Vec<OptimizationReport>) -> Self {
        let mut total_profit_by_target = std::collections::BTreeMap::new();
        for r in reports.iter().filter(|r| r.is_opportunity()) {
            *total_profit_by_target.entry(r.target.clone()).or_insert(0.0) += r.profit;
        }
        ScanResponse {
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            scanned: reports.len(),
            opportunities: reports.iter().filter(|r| r.is_opportunity()).count(),
            total_profit_by_target,
            reports,
            error: None,
        }
    }

    pub fn rejected(error: String) -> Self {
        ScanResponse {
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            scanned: 0,
            opportunities: 0,
            total_profit_by_target: std::collections::BTreeMap::new(),
            reports: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}
