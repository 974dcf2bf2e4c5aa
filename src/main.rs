mod adapters;
mod application;
mod domain;
mod services;

use std::sync::Arc;

use adapters::{
    controllers::{health_controller::HealthController, upload_controller::UploadController},
    state::AppState,
};
use application::services::DocumentStore;
use axum::{routing::get, Router};
use domain::config::settings::GraphSettings;
use services::GraphStorageService;
use tower_http::cors::{Any, CorsLayer};

async fn hello_world() -> &'static str {
    "Hello, world!"
}

fn build_cors() -> CorsLayer {
    if let Ok(allowed_origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
        // Parse comma-separated origins
        let origins: Vec<_> = allowed_origins
            .split(',')
            .map(|s| s.trim().parse().expect("Invalid CORS origin"))
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Allow all origins if not specified (only for development)
        CorsLayer::permissive()
    }
}

fn app_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(hello_world))
        .route("/api/v1/health", get(HealthController::health_check))
        .route(
            "/api/v1/upload",
            get(UploadController::upload_info)
                .post(UploadController::upload_file)
                .fallback(UploadController::method_not_allowed),
        )
        .layer(build_cors())
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16");

    // Uploads stay disabled (answered with a configuration error) until the
    // Graph environment is complete; diagnostics keep working either way.
    let store: Option<Arc<dyn DocumentStore>> = match GraphSettings::from_env() {
        Ok(settings) => {
            tracing::info!(
                "Graph upload configured for site {} (drive {})",
                settings.site_id,
                settings.drive_id
            );
            match GraphStorageService::new(settings) {
                Ok(service) => Some(Arc::new(service)),
                Err(e) => {
                    tracing::error!("Failed to build Graph storage client: {}", e);
                    None
                }
            }
        }
        Err(e) => {
            tracing::error!("Graph upload not configured: {}", e);
            None
        }
    };

    let app_state = AppState { store };
    let router = app_router(app_state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind to port");

    tracing::info!("Server listening on 0.0.0.0:{}", port);

    axum::serve(listener, router)
        .await
        .expect("Failed to start server");
}
