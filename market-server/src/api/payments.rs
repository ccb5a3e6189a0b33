//! Payment Session API Handlers
//!
//! 网关回调走共享密钥头校验，不走用户 JWT。

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{
    Json, Router,
    extract::{Path, State},
};
use shared::ApiResponse;
use shared::models::{PaymentSession, Role};
use shared::request::GatewayConfirmation;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult, ok};

const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// 为订单重开支付会话（会话过期或创建时网关不可用后使用）
pub async fn open_session(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<PaymentSession>>> {
    // 参与方校验；卖家无权代买家开启付款
    state
        .orders
        .get_for_actor(&user.actor_id, user.role, &order_id)
        .await
        .map_err(AppError::from)?;
    if user.role == Role::Seller {
        return Err(AppError::forbidden("Only the buyer may open a payment session"));
    }

    let session = state
        .payments
        .open(&order_id)
        .await
        .map_err(AppError::from)?;
    Ok(ok(session))
}

/// 查询订单当前支付会话
pub async fn get_session(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<PaymentSession>>> {
    state
        .orders
        .get_for_actor(&user.actor_id, user.role, &order_id)
        .await
        .map_err(AppError::from)?;

    let session = state
        .payments
        .find(&order_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found(format!("Order {order_id} has no payment session")))?;
    Ok(ok(session))
}

/// 网关支付确认回调（at-least-once，重复投递幂等）
pub async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<GatewayConfirmation>,
) -> AppResult<Json<ApiResponse<()>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::unauthorized)?;
    if signature != state.config.gateway_webhook_secret {
        return Err(AppError::unauthorized());
    }

    tracing::info!(
        order_id = %payload.order_id,
        transaction_id = ?payload.transaction_id,
        "Gateway payment confirmation received"
    );
    state
        .payments
        .resolve_success(&payload.order_id)
        .await
        .map_err(AppError::from)?;
    Ok(ok(()))
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/orders/{order_id}/payment-session",
            post(open_session).get(get_session),
        )
        .route("/api/payments/webhook", post(webhook))
}
