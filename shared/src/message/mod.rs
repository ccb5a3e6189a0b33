//! 推送通道消息类型定义
//!
//! 这些类型在 market-server 和客户端之间共享。推送通道只是
//! 缓存失效信号，不是事实来源：事件内容完全可由服务端存储的
//! 权威状态重建，客户端错过推送后在重连时重新拉取即可。
//!
//! # 消息流
//!
//! ```text
//! 状态机提交 ──▶ Notifier ──▶ ConnectionRegistry ──▶ 买家/卖家的所有活动连接
//! 支付会话事件 ─┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// 推送事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushEventType {
    /// 支付会话已创建（二维码可用）
    QrCreated,
    /// 付款成功
    PaymentSuccess,
    /// 支付会话过期
    QrExpired,
    /// 订单状态流转已提交
    OrderUpdated,
    /// 保活信号，无负载，消费方必须忽略
    Ping,
}

impl fmt::Display for PushEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PushEventType::QrCreated => "QR_CREATED",
            PushEventType::PaymentSuccess => "PAYMENT_SUCCESS",
            PushEventType::QrExpired => "QR_EXPIRED",
            PushEventType::OrderUpdated => "ORDER_UPDATED",
            PushEventType::Ping => "PING",
        };
        write!(f, "{}", s)
    }
}

/// 推送事件 `{type, data}`
///
/// 同一订单的事件按提交顺序送达；不同订单之间不保证顺序。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub event_type: PushEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl PushEvent {
    /// 创建携带负载的事件
    ///
    /// 负载序列化失败时退化为空负载（事件本身仍然送达，
    /// 客户端会按缓存失效语义重新拉取）。
    pub fn new<T: Serialize>(event_type: PushEventType, data: &T) -> Self {
        Self {
            event_type,
            data: serde_json::to_value(data).ok(),
        }
    }

    /// 保活事件（无负载）
    pub fn ping() -> Self {
        Self {
            event_type: PushEventType::Ping,
            data: None,
        }
    }

    /// 是否为保活事件
    pub fn is_ping(&self) -> bool {
        self.event_type == PushEventType::Ping
    }

    /// 序列化为传输 JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 从传输 JSON 解析
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_has_no_payload() {
        let ping = PushEvent::ping();
        assert!(ping.is_ping());
        let json = ping.to_json().unwrap();
        assert_eq!(json, r#"{"type":"PING"}"#);
    }

    #[test]
    fn test_event_type_wire_format() {
        let event = PushEvent::new(PushEventType::PaymentSuccess, &serde_json::json!({"order_id": "o-1"}));
        let json = event.to_json().unwrap();
        assert!(json.contains(r#""type":"PAYMENT_SUCCESS""#));
        let back = PushEvent::from_json(&json).unwrap();
        assert_eq!(back.event_type, PushEventType::PaymentSuccess);
    }
}
