//! API 统一响应结构
//!
//! ```json
//! {
//!   "code": "E0000",
//!   "message": "Success",
//!   "data": { ... }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::models::{Order, PaymentSession};

/// API 统一响应结构
///
/// `code` 为 "E0000" 表示成功，其余为稳定错误码。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 错误码 (E0000 表示成功)
    pub code: String,
    /// 消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: "E0000".to_string(),
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    /// 是否成功
    pub fn is_success(&self) -> bool {
        self.code == "E0000"
    }
}

/// 令牌过期的稳定错误码，客户端据此触发单飞刷新
pub const CODE_TOKEN_EXPIRED: &str = "E3003";

/// 创建订单的响应：订单本体 + 随单开启的支付会话
///
/// 网关暂不可用时 session 为空，订单仍创建成功，
/// 客户端稍后可单独重开支付会话。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithSession {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<PaymentSession>,
}
