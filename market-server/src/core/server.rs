//! HTTP 服务器启动与优雅关闭

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::core::ServerState;
use crate::routes::build_app;
use crate::utils::AppError;

/// 启动 HTTP 服务并阻塞至 shutdown 信号
pub async fn serve(state: ServerState, shutdown: CancellationToken) -> Result<(), AppError> {
    let addr = format!("0.0.0.0:{}", state.config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, "HTTP server listening");

    let app = build_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
