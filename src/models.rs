use serde::{Deserialize, Serialize};

use crate::engine::pricing::StartPrice;
use crate::math::AnyCurve;

/// One arbitrage problem: a connected curve subset ("miniverse") and the
/// token to collect the profit in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArbCandidate {
    #[serde(default)]
    pub id: Option<String>,
    pub curves: Vec<AnyCurve>,
    pub target: String,
    #[serde(default)]
    pub pstart: Option<StartPrice>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Converged,   // equilibrium found, trades attached
    Failed,      // solver gave up; no opportunity here
    Rejected,    // malformed candidate
}
