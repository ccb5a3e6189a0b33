//! 业务事件推送
//!
//! Notifier 是提交路径与连接注册表之间的薄封装：订单提交成功后，
//! 由持有订单锁的调用方同步扇出，保证同一订单的事件顺序与提交顺序一致。

use std::sync::Arc;

use serde::Serialize;
use shared::message::{PushEvent, PushEventType};
use shared::models::Order;

use super::ConnectionRegistry;

#[derive(Clone)]
pub struct Notifier {
    registry: Arc<ConnectionRegistry>,
}

#[derive(Debug, Serialize)]
struct SessionEventPayload<'a> {
    order_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkout_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qr_code: Option<&'a str>,
}

impl Notifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 订单更新事件，推给买卖双方
    pub fn order_updated(&self, order: &Order) {
        let event = PushEvent::new(PushEventType::OrderUpdated, order);
        self.push_to_participants(order, &event);
    }

    /// 支付会话事件（QR_CREATED / PAYMENT_SUCCESS / QR_EXPIRED），推给买卖双方
    pub fn session_event(
        &self,
        event_type: PushEventType,
        order: &Order,
        checkout_url: Option<&str>,
        qr_code: Option<&str>,
    ) {
        let payload = SessionEventPayload {
            order_id: &order.order_id,
            checkout_url,
            qr_code,
        };
        let event = PushEvent::new(event_type, &payload);
        self.push_to_participants(order, &event);
    }

    fn push_to_participants(&self, order: &Order, event: &PushEvent) {
        let buyer = self.registry.push_to_user(&order.buyer_id, event);
        let seller = self.registry.push_to_user(&order.seller_id, event);
        tracing::debug!(
            order_id = %order.order_id,
            event = %event.event_type,
            buyer_conns = buyer,
            seller_conns = seller,
            "Event pushed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus;
    use shared::util::now_millis;

    fn sample_order() -> Order {
        Order {
            order_id: "ord_1".to_string(),
            buyer_id: "buyer-1".to_string(),
            seller_id: "seller-1".to_string(),
            items: vec![],
            subtotal: 0,
            shipping_fee: 0,
            discount: 0,
            total: 0,
            status: OrderStatus::AwaitingPayment,
            prior_status: None,
            shipping_address: "1 Example Street".to_string(),
            shipping_method: "standard".to_string(),
            note: None,
            created_at: now_millis(),
            updated_at: now_millis(),
            expires_at: None,
            timeline: vec![],
        }
    }

    #[test]
    fn test_order_updated_reaches_both_participants() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Notifier::new(registry.clone());
        let (_b, mut buyer_rx) = registry.register("buyer-1");
        let (_s, mut seller_rx) = registry.register("seller-1");

        notifier.order_updated(&sample_order());

        assert_eq!(buyer_rx.try_recv().unwrap().event_type, PushEventType::OrderUpdated);
        assert_eq!(seller_rx.try_recv().unwrap().event_type, PushEventType::OrderUpdated);
    }
}
