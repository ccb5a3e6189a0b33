//! 推送通道 WebSocket 端点
//!
//! 浏览器 WebSocket 握手无法携带 Authorization 头，令牌经
//! `?token=` 查询参数传入，升级前先验签。
//! 通道是单向的（服务端 → 客户端），客户端帧一律忽略，
//! 仅用于探测断连。

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::auth::JwtError;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub token: String,
}

/// GET /api/events - 订阅推送事件
pub async fn subscribe(
    State(state): State<ServerState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let claims = state
        .jwt_service
        .validate_token(&query.token)
        .map_err(|e| match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            other => AppError::invalid_token(other.to_string()),
        })?;

    let user_id = claims.sub;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(mut socket: WebSocket, state: ServerState, user_id: String) {
    let (conn_id, mut rx) = state.registry.register(&user_id);

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let Ok(text) = event.to_json() else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.registry.unregister(&user_id, &conn_id);
}

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events", get(subscribe))
}
