//! JSON status API over the provider monitor

pub mod controllers;
pub mod state;

use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing::info;

use crate::errors::Result;
use crate::monitor::ProviderMonitor;
pub use state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(controllers::health_check))
        .route("/providers", web::get().to(controllers::get_providers))
        .route("/providers/summary", web::get().to(controllers::get_summary))
        .route("/providers/refresh", web::post().to(controllers::refresh_providers))
        .route("/providers/{name}", web::get().to(controllers::get_provider))
        .route("/system", web::get().to(controllers::get_system_info));
}

/// Serve the status API until the server is shut down
pub async fn run_server(monitor: Arc<ProviderMonitor>, bind_address: &str) -> Result<()> {
    let state = web::Data::new(AppState::new(monitor));

    info!("Status API is live at http://{}", bind_address);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind_address)?
        .run()
        .await?;

    Ok(())
}
