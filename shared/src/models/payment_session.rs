//! 支付会话模型
//!
//! 每个订单同一时刻最多存在一个 OPEN 会话（1:1 按 order_id 键控）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 支付会话默认有效期（秒），服务端可经配置覆盖
pub const SESSION_EXPIRE_IN_SECS: i64 = 900;

/// 会话状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// 等待付款
    Open,
    /// 付款成功
    Succeeded,
    /// 已过期
    Expired,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Open => "OPEN",
            SessionStatus::Succeeded => "SUCCEEDED",
            SessionStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", s)
    }
}

/// 支付会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    /// 所属订单 ID（1:1）
    pub order_id: String,
    /// 收银台链接
    pub checkout_url: String,
    /// 付款二维码
    pub qr_code: String,
    /// 创建时间 (Unix millis)
    pub created_at: i64,
    /// 有效期（秒），签发时由服务端写入（默认 900）
    pub expire_in: i64,
    /// 会话状态
    pub status: SessionStatus,
}

impl PaymentSession {
    /// 到期时刻 (Unix millis)
    ///
    /// 始终由 `created_at + expire_in` 推导而非内存定时器，
    /// 保证进程重启后待过期会话不会丢失。
    pub fn deadline_millis(&self) -> i64 {
        self.created_at + self.expire_in * 1000
    }

    /// 是否仍在等待付款
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_derived_from_created_at() {
        let session = PaymentSession {
            order_id: "o-1".to_string(),
            checkout_url: "https://pay.example.com/c/1".to_string(),
            qr_code: "QR".to_string(),
            created_at: 1_000_000,
            expire_in: SESSION_EXPIRE_IN_SECS,
            status: SessionStatus::Open,
        };
        assert_eq!(session.deadline_millis(), 1_000_000 + 900 * 1000);
    }
}
