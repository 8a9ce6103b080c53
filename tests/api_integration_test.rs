// tests/api_integration_test.rs
// ===================================
// Exercises the HTTP surface end to end through Rocket's local client.

use margp_arbitrage::bootstrap::AppState;
use margp_arbitrage::config::Config;
use margp_arbitrage::engine::OptimizerConfig;
use margp_arbitrage::web::routes::{health, metrics, optimize, scan};
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use rocket::routes;
use serde_json::{json, Value};
use std::sync::Arc;

fn client(max_scan_candidates: usize) -> Client {
    let config = Config { port: 0, max_scan_candidates, optimizer: OptimizerConfig::default() };
    let rocket = rocket::build()
        .manage(Arc::new(AppState::new(&config)))
        .mount("/", routes![optimize, scan, health, metrics]);
    Client::tracked(rocket).expect("valid rocket instance")
}

fn two_pool_candidate(id: &str, p_b: f64) -> Value {
    json!({
        "id": id,
        "target": "ETH",
        "curves": [
            { "kind": "constant_product", "cid": "uni", "tknx": "ETH", "tkny": "USDC",
              "x": 100.0, "y": 340000.0 },
            { "kind": "constant_product", "cid": "aero", "tknx": "ETH", "tkny": "USDC",
              "x": 100.0, "y": p_b * 100.0 }
        ]
    })
}

#[test]
fn test_optimize_endpoint_returns_report() {
    let client = client(8);
    let response = client
        .post("/api/v1/optimize")
        .header(ContentType::JSON)
        .body(two_pool_candidate("pair-1", 3_500.0).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().expect("json body");
    assert_eq!(body["status"], "CONVERGED");
    assert_eq!(body["id"], "pair-1");
    assert!(body["profit"].as_f64().expect("profit") > 0.0);
    assert!(body.get("timestamp_utc").is_some());
    assert_eq!(body["prices"]["ETH"], 1.0);

    let trades = body["trade_instructions"].as_array().expect("trades");
    assert_eq!(trades.len(), 2);
    for t in trades {
        assert!(t.get("tkn_in").is_some() && t.get("amt_out").is_some());
        assert!(t.get("error").is_none());
    }
}

#[test]
fn test_optimize_endpoint_rejects_bad_target_and_honours_params() {
    let client = client(8);
    let mut request = two_pool_candidate("bad", 3_500.0);
    request["target"] = json!("WBTC");
    let body: Value = client
        .post("/api/v1/optimize")
        .header(ContentType::JSON)
        .body(request.to_string())
        .dispatch()
        .into_json()
        .expect("json body");
    assert_eq!(body["status"], "REJECTED");
    assert!(body["error"].as_str().expect("error").contains("WBTC"));

    let mut request = two_pool_candidate("short", 2_000.0);
    request["params"] = json!({ "maxiter": 1 });
    let body: Value = client
        .post("/api/v1/optimize")
        .header(ContentType::JSON)
        .body(request.to_string())
        .dispatch()
        .into_json()
        .expect("json body");
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["iterations"], 1);
}

#[test]
fn test_scan_endpoint_ranks_and_limits() {
    let client = client(3);
    let request = json!({
        "candidates": [
            two_pool_candidate("small", 3_420.0),
            two_pool_candidate("large", 3_600.0),
        ]
    });
    let body: Value = client
        .post("/api/v1/scan")
        .header(ContentType::JSON)
        .body(request.to_string())
        .dispatch()
        .into_json()
        .expect("json body");
    assert_eq!(body["scanned"], 2);
    assert_eq!(body["opportunities"], 2);
    assert_eq!(body["reports"][0]["id"], "large");
    assert!(body["total_profit_by_target"]["ETH"].as_f64().expect("total") > 0.0);

    let too_many = json!({
        "candidates": (0..4).map(|i| two_pool_candidate(&i.to_string(), 3_500.0)).collect::<Vec<_>>()
    });
    let body: Value = client
        .post("/api/v1/scan")
        .header(ContentType::JSON)
        .body(too_many.to_string())
        .dispatch()
        .into_json()
        .expect("json body");
    assert_eq!(body["scanned"], 0);
    assert!(body["error"].as_str().expect("error").contains("limit"));
}

#[test]
fn test_health_and_metrics() {
    let client = client(8);
    let health: Value = client.get("/health").dispatch().into_json().expect("json body");
    assert_eq!(health["status"], "OK");

    client
        .post("/api/v1/optimize")
        .header(ContentType::JSON)
        .body(two_pool_candidate("m", 3_500.0).to_string())
        .dispatch();
    let text = client.get("/metrics").dispatch().into_string().expect("metrics text");
    assert!(text.contains("margp_requests_total 1\n"));
    assert!(text.contains("margp_candidates_total{status=\"converged\"} 1\n"));
}
