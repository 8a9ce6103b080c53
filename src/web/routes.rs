use rocket::serde::json::Json;
use rocket::{get, post, State};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::bootstrap::AppState;
use crate::engine::service::{optimize_candidate, scan_candidates, OptimizationReport};
use crate::models::ReportStatus;
use crate::web::dto::{HealthResponse, OptimizeRequest, ScanRequest, ScanResponse};

#[post("/api/v1/optimize", format = "json", data = "<request>")]
pub async fn optimize(
    request: Json<OptimizeRequest>,
    app_state: &State<Arc<AppState>>,
) -> Json<OptimizationReport> {
    app_state.counters.requests.fetch_add(1, Ordering::Relaxed);
    let (candidate, config) = request.into_inner().into_parts(&app_state.optimizer);
    let id = candidate.id.clone();
    let target = candidate.target.clone();

    // Newton iterations are CPU bound; keep them off the async workers
    let report = match tokio::task::spawn_blocking(move || optimize_candidate(&candidate, &config)).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("Failed to optimize candidate {:?}: {}", id, e);
            OptimizationReport::empty(id, &target, ReportStatus::Rejected, Some(format!("ERROR: {}", e)))
        }
    };
    app_state.counters.record(report.status);
    Json(report)
}

#[post("/api/v1/scan", format = "json", data = "<request>")]
pub async fn scan(
    request: Json<ScanRequest>,
    app_state: &State<Arc<AppState>>,
) -> Json<ScanResponse> {
    app_state.counters.requests.fetch_add(1, Ordering::Relaxed);
    let request = request.into_inner();

    if request.candidates.len() > app_state.max_scan_candidates {
        log::error!(
            "Scan rejected: {} candidates exceeds limit of {}",
            request.candidates.len(),
            app_state.max_scan_candidates
        );
        return Json(ScanResponse::rejected(format!(
            "ERROR: {} candidates exceeds limit of {}",
            request.candidates.len(),
            app_state.max_scan_candidates
        )));
    }

    let config = request.params.unwrap_or_else(|| app_state.optimizer.clone());
    let reports = scan_candidates(request.candidates, config).await;
    for report in &reports {
        app_state.counters.record(report.status);
    }
    Json(ScanResponse::from_reports(reports))
}

#[get("/health")]
pub fn health(app_state: &State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: app_state.started_at.elapsed().as_secs(),
    })
}

#[get("/metrics")]
pub fn metrics(app_state: &State<Arc<AppState>>) -> String {
    app_state.render_metrics()
}
