use axum::{extract::State, Json};
use serde::Serialize;
use sysinfo::System;
use tracing::info;

use crate::adapters::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    #[serde(rename = "uploadConfigured")]
    pub upload_configured: bool,
    pub metrics: SystemMetrics,
}

#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    #[serde(rename = "cpuUsagePercent")]
    pub cpu_usage_percent: f32,
    #[serde(rename = "memoryUsedBytes")]
    pub memory_used_bytes: u64,
    #[serde(rename = "memoryTotalBytes")]
    pub memory_total_bytes: u64,
    #[serde(rename = "memoryUsagePercent")]
    pub memory_usage_percent: f32,
}

pub struct HealthController;

impl HealthController {
    /// GET /api/v1/health
    pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
        info!("Health check requested");

        // Collect system metrics (only refresh what's needed)
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_usage = sys.global_cpu_usage();
        let memory_used = sys.used_memory();
        let memory_total = sys.total_memory();
        let memory_usage_percent = if memory_total > 0 {
            (memory_used as f32 / memory_total as f32) * 100.0
        } else {
            0.0
        };

        let metrics = SystemMetrics {
            cpu_usage_percent: cpu_usage,
            memory_used_bytes: memory_used,
            memory_total_bytes: memory_total,
            memory_usage_percent,
        };

        Json(HealthResponse {
            status: "healthy".to_string(),
            service: "inspection-form-service".to_string(),
            upload_configured: app_state.store.is_some(),
            metrics,
        })
    }
}
