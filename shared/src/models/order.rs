//! 订单模型
//!
//! 订单状态是闭集：除下方枚举值外无其他可表示状态。
//! `timeline` 为 append-only 列表，条目创建后不再修改或删除。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 订单状态（闭集）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 等待买家付款
    AwaitingPayment,
    /// 已付款，等待卖家接单
    AwaitingAccept,
    /// 卖家已接单
    Accepted,
    /// 买家申请取消，等待卖家处理
    CancelRequested,
    /// 买家确认收货（终态）
    Delivered,
    /// 卖家拒单（终态）
    Rejected,
    /// 已取消（终态）
    Cancelled,
}

impl OrderStatus {
    /// 是否终态（终态订单保留为历史记录，不再流转）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::AwaitingAccept => "AWAITING_ACCEPT",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::CancelRequested => "CANCEL_REQUESTED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// 订单动作（闭集）
///
/// 状态机只接受这些动作；动作与当前状态不匹配时返回 InvalidTransition。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    /// 买家在付款前取消订单
    CancelOrder,
    /// 支付会话确认付款成功（非人工动作）
    PaymentSucceeded,
    /// 卖家接单
    Confirm,
    /// 卖家拒单
    Reject,
    /// 买家申请取消（付款后）
    CancelRequest,
    /// 卖家同意取消
    AcceptCancel,
    /// 卖家拒绝取消，恢复原状态
    RejectCancel,
    /// 买家确认收货
    MarkReceived,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderAction::CancelOrder => "cancel_order",
            OrderAction::PaymentSucceeded => "payment_succeeded",
            OrderAction::Confirm => "confirm",
            OrderAction::Reject => "reject",
            OrderAction::CancelRequest => "cancel_request",
            OrderAction::AcceptCancel => "accept_cancel",
            OrderAction::RejectCancel => "reject_cancel",
            OrderAction::MarkReceived => "mark_received",
        };
        write!(f, "{}", s)
    }
}

/// 订单行项目 - 下单时从购物车固化的不可变快照
///
/// 下单后商品价格或购物车的任何变动都不影响已创建的订单。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// 商品 ID
    pub product_id: String,
    /// 商品名称快照
    pub name: String,
    /// 单价快照（最小货币单位）
    pub price: i64,
    /// 数量
    pub quantity: i32,
    /// 商品图片快照
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderItem {
    /// 行小计
    pub fn line_total(&self) -> i64 {
        self.price * self.quantity as i64
    }
}

/// 订单时间线条目（append-only）
///
/// 管理员代操作与普通操作记录方式完全一致。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    /// 进入的状态
    pub status: OrderStatus,
    /// 时间戳 (Unix millis)
    pub timestamp: i64,
    /// 操作者 ID（系统事件为固定标识）
    pub actor_id: String,
    /// 描述
    pub description: String,
}

/// 订单
///
/// 金额字段使用最小货币单位的 i64（单一货币）。
/// `total = subtotal + shipping_fee - discount`，创建时计算一次，之后不再重算。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 订单 ID（应用层生成）
    pub order_id: String,
    /// 买家 ID
    pub buyer_id: String,
    /// 卖家 ID
    pub seller_id: String,
    /// 行项目快照
    pub items: Vec<OrderItem>,
    /// 商品小计
    pub subtotal: i64,
    /// 运费
    pub shipping_fee: i64,
    /// 折扣
    pub discount: i64,
    /// 应付总额
    pub total: i64,
    /// 当前状态
    pub status: OrderStatus,
    /// 进入 CANCEL_REQUESTED 时捕获的原状态，离开时清空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_status: Option<OrderStatus>,
    /// 收货地址
    pub shipping_address: String,
    /// 配送方式
    pub shipping_method: String,
    /// 买家备注
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 创建时间 (Unix millis)
    pub created_at: i64,
    /// 最后更新时间 (Unix millis)
    pub updated_at: i64,
    /// 当前支付会话到期时间，仅在等待付款期间有意义
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// 状态时间线（append-only）
    pub timeline: Vec<TimelineEntry>,
}

impl Order {
    /// 判断用户是否为订单参与方
    pub fn is_participant(&self, actor_id: &str) -> bool {
        self.buyer_id == actor_id || self.seller_id == actor_id
    }
}
