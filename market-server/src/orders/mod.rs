//! Order lifecycle module
//!
//! 订单状态机是所有状态流转的唯一权威：
//!
//! - **transition**: 闭合流转表（合法边 + 动作归属方）
//! - **service**: 流转执行（按订单加锁、重读当前状态、提交、
//!   提交后调度副作用与推送）
//!
//! # 提交路径
//!
//! ```text
//! 请求 ──▶ 订单锁 ──▶ 重读状态 ──▶ 合法性 + 授权 ──▶ 提交(状态 + 时间线)
//!                                                        │
//!                                      副作用队列 ◀───────┤ (提交后，失败不回滚)
//!                                      推送扇出  ◀───────┘
//! ```

pub mod service;
pub mod transition;

pub use service::OrderService;
pub use transition::{Target, resolve};

use shared::models::{OrderStatus, Role};
use thiserror::Error;

use crate::db::repository::RepoError;

/// 系统事件在时间线中的操作者标识
pub const SYSTEM_ACTOR_ID: &str = "payment_session";

/// 流转请求的发起方
#[derive(Debug, Clone)]
pub enum Actor {
    /// 已认证用户
    User { id: String, role: Role },
    /// 支付会话（payment_succeeded 的唯一合法来源）
    System,
}

impl Actor {
    /// 记入时间线的操作者 ID
    pub fn actor_id(&self) -> &str {
        match self {
            Actor::User { id, .. } => id,
            Actor::System => SYSTEM_ACTOR_ID,
        }
    }

    /// 由已认证用户构造
    pub fn user(id: impl Into<String>, role: Role) -> Self {
        Actor::User {
            id: id.into(),
            role,
        }
    }
}

/// 订单域错误
///
/// 每个变体都携带订单 ID；流转类错误另带当前状态，
/// 客户端据此决定「重拉后重试」还是直接提示用户。
#[derive(Debug, Error)]
pub enum OrderError {
    /// 动作在当前状态下不合法（可恢复；重试同一动作无意义，不自动重试）
    #[error("order {order_id}: action '{action}' is not allowed from status {current}")]
    InvalidTransition {
        order_id: String,
        current: OrderStatus,
        action: String,
    },

    /// 操作者与订单归属不匹配（该请求即告失败）
    #[error("order {order_id}: actor {actor_id} may not perform '{action}'")]
    Unauthorized {
        order_id: String,
        actor_id: String,
        action: String,
    },

    /// 订单不存在
    #[error("order {order_id} not found")]
    NotFound { order_id: String },

    /// 同订单已存在 OPEN 支付会话（可恢复；调用方应复用现有会话）
    #[error("order {order_id} already has an open payment session")]
    SessionConflict { order_id: String },

    /// 下游协作方不可用
    ///
    /// 流转已提交后发生时由重试队列兜底，绝不回滚已提交的状态。
    #[error("order {order_id}: upstream call failed: {message}")]
    UpstreamUnavailable { order_id: String, message: String },

    /// 存储错误
    #[error("storage error: {0}")]
    Storage(#[from] RepoError),
}

impl From<OrderError> for crate::utils::AppError {
    fn from(e: OrderError) -> Self {
        use crate::utils::AppError;
        match &e {
            OrderError::InvalidTransition { .. } => AppError::business_rule(e.to_string()),
            OrderError::Unauthorized { .. } => AppError::forbidden(e.to_string()),
            OrderError::NotFound { .. } => AppError::not_found(e.to_string()),
            OrderError::SessionConflict { .. } => AppError::conflict(e.to_string()),
            OrderError::UpstreamUnavailable { .. } => AppError::upstream(e.to_string()),
            OrderError::Storage(inner) => AppError::database(inner.to_string()),
        }
    }
}
