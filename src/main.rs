use anyhow::Context;
use rocket::routes;
use std::sync::Arc;

use margp_arbitrage::bootstrap::AppState;
use margp_arbitrage::config::Config;
use margp_arbitrage::web::routes::{health, metrics, optimize, scan};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Build application state
    let app_state = Arc::new(AppState::new(&config));

    // Configure Rocket
    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("address", "0.0.0.0"));

    rocket::custom(figment)
        .manage(app_state)
        .mount("/", routes![optimize, scan, health, metrics])
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket failed: {}", e))?;
    Ok(())
}
