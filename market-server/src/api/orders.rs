//! Order API Handlers

use axum::routing::{get, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use shared::ApiResponse;
use shared::models::{Order, OrderAction, Role};
use shared::request::{CreateOrderRequest, ListOrdersQuery, TransitionRequest};
use shared::response::OrderWithSession;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::{Actor, OrderError};
use crate::utils::{AppError, AppResult, ok};

/// 创建订单并随单开启支付会话
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithSession>>> {
    payload.validate()?;
    if user.role != Role::Buyer {
        return Err(AppError::forbidden("Only buyers may create orders"));
    }

    let order = state
        .orders
        .create(&user.actor_id, payload)
        .await
        .map_err(AppError::from)?;

    let session = match state.payments.open(&order.order_id).await {
        Ok(s) => Some(s),
        Err(OrderError::UpstreamUnavailable { message, .. }) => {
            tracing::warn!(
                order_id = %order.order_id, %message,
                "Checkout unavailable at order creation, session deferred"
            );
            None
        }
        Err(e) => return Err(e.into()),
    };

    // 会话开启会写入支付期限，重读返回最新快照
    let order = state
        .orders
        .get_for_actor(&user.actor_id, user.role, &order.order_id)
        .await
        .map_err(AppError::from)?;

    Ok(ok(OrderWithSession { order, session }))
}

/// 按角色列出可见订单
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state
        .orders
        .list_for_actor(&user.actor_id, user.role, query.status)
        .await
        .map_err(AppError::from)?;
    Ok(ok(orders))
}

/// 取单（参与方或管理员）
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .get_for_actor(&user.actor_id, user.role, &order_id)
        .await
        .map_err(AppError::from)?;
    Ok(ok(order))
}

/// 执行状态流转
pub async fn transition(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    // 支付确认只能由网关回调驱动
    if payload.action == OrderAction::PaymentSucceeded {
        return Err(AppError::forbidden("payment_succeeded is not a user action"));
    }

    let actor = Actor::user(user.actor_id.clone(), user.role);
    let order = state
        .orders
        .apply_transition(&actor, &order_id, payload.action)
        .await
        .map_err(AppError::from)?;
    Ok(ok(order))
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", post(create).get(list))
        .route("/api/orders/{order_id}", get(get_by_id))
        .route("/api/orders/{order_id}/transition", post(transition))
}
