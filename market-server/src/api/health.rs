//! Health API

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use shared::ApiResponse;

use crate::core::ServerState;
use crate::utils::ok;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// 健康检查（无需认证）
pub async fn health() -> Json<ApiResponse<HealthStatus>> {
    ok(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}
