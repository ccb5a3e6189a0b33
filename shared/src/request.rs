//! 请求 DTO
//!
//! 客户端与服务端共享的请求体定义。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{OrderAction, OrderItem, OrderStatus};

/// 创建订单请求
///
/// `items` 是购物车服务在结算时固化的行项目快照；
/// 之后购物车的任何变动都不影响已创建的订单。
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    /// 卖家 ID
    #[validate(length(min = 1, message = "seller_id is required"))]
    pub seller_id: String,
    /// 购物车行快照
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<OrderItem>,
    /// 运费
    #[serde(default)]
    pub shipping_fee: i64,
    /// 折扣
    #[serde(default)]
    pub discount: i64,
    /// 收货地址
    pub shipping_address: String,
    /// 配送方式
    pub shipping_method: String,
    /// 买家备注
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 状态流转请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// 要执行的动作
    pub action: OrderAction,
}

/// 订单列表过滤
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    /// 按状态过滤（缺省返回全部）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

/// 支付网关确认回调
///
/// 网关按 at-least-once 语义投递，同一确认可能重复到达。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfirmation {
    /// 付款成功的订单 ID
    pub order_id: String,
    /// 网关侧交易号（仅用于日志追踪）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}
