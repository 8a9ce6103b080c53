use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::config::Config;
use crate::engine::OptimizerConfig;
use crate::models::ReportStatus;

#[derive(Debug, Default)]
pub struct Counters {
    pub requests: AtomicU64,
    pub converged: AtomicU64,
    pub failed: AtomicU64,
    pub rejected: AtomicU64,
}

impl Counters {
    pub fn record(&self, status: ReportStatus) {
        let slot = match status {
            ReportStatus::Converged => &self.converged,
            ReportStatus::Failed => &self.failed,
            ReportStatus::Rejected => &self.rejected,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct AppState {
    pub optimizer: OptimizerConfig,
    pub max_scan_candidates: usize,
    pub started_at: Instant,
    pub counters: Counters,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        log::info!(
            "Optimizer defaults: max_iter={} epsr={:e} mode={:?} norm={}",
            config.optimizer.max_iter,
            config.optimizer.epsr,
            config.optimizer.mode,
            config.optimizer.norm,
        );
        AppState {
            optimizer: config.optimizer.clone(),
            max_scan_candidates: config.max_scan_candidates,
            started_at: Instant::now(),
            counters: Counters::default(),
        }
    }

    /// Prometheus text exposition of the counters.
    pub fn render_metrics(&self) -> String {
        let c = &self.counters;
        format!(
            "# TYPE margp_uptime_seconds counter\n\
             margp_uptime_seconds {}\n\
             # TYPE margp_requests_total counter\n\
             margp_requests_total {}\n\
             # TYPE margp_candidates_total counter\n\
             margp_candidates_total{{status=\"converged\"}} {}\n\
             margp_candidates_total{{status=\"failed\"}} {}\n\
             margp_candidates_total{{status=\"rejected\"}} {}\n\
             # TYPE margp_info gauge\n\
             margp_info{{version=\"{}\",service=\"arbitrage\"}} 1\n",
            self.started_at.elapsed().as_secs(),
            c.requests.load(Ordering::Relaxed),
            c.converged.load(Ordering::Relaxed),
            c.failed.load(Ordering::Relaxed),
            c.rejected.load(Ordering::Relaxed),
            env!("CARGO_PKG_VERSION"),
        )
    }
}
