//! 闭合流转表
//!
//! 订单状态图是固定闭集，所有合法边都在 [`resolve`] 的 match 里；
//! 未列出的 (状态, 动作) 组合一律非法。表驱动使重复重试天然幂等：
//! 对已 ACCEPTED 的订单再次 confirm 只会得到 InvalidTransition，
//! 不会产生第二次副作用。

use shared::models::{OrderAction, OrderStatus};

/// 流转目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// 直接进入目标状态
    To(OrderStatus),
    /// 捕获当前状态到 `prior_status` 后进入目标状态（cancel_request）
    CaptureAndTo(OrderStatus),
    /// 恢复捕获的 `prior_status`（reject_cancel）
    RestorePrior,
}

/// 动作的合法执行方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    Buyer,
    Seller,
    /// 支付会话驱动，非人工动作
    System,
}

/// 解析 (当前状态, 动作) 的流转目标；非法组合返回 None
pub fn resolve(current: OrderStatus, action: OrderAction) -> Option<Target> {
    use OrderAction::*;
    use OrderStatus::*;

    match (current, action) {
        (AwaitingPayment, CancelOrder) => Some(Target::To(Cancelled)),
        (AwaitingPayment, PaymentSucceeded) => Some(Target::To(AwaitingAccept)),
        (AwaitingAccept, Confirm) => Some(Target::To(Accepted)),
        (AwaitingAccept, Reject) => Some(Target::To(Rejected)),
        (AwaitingAccept, CancelRequest) => Some(Target::CaptureAndTo(CancelRequested)),
        (Accepted, CancelRequest) => Some(Target::CaptureAndTo(CancelRequested)),
        (CancelRequested, AcceptCancel) => Some(Target::To(Cancelled)),
        (CancelRequested, RejectCancel) => Some(Target::RestorePrior),
        (Accepted, MarkReceived) => Some(Target::To(Delivered)),
        _ => None,
    }
}

/// 动作归属方
pub fn required_actor(action: OrderAction) -> ActorKind {
    use OrderAction::*;
    match action {
        CancelOrder | CancelRequest | MarkReceived => ActorKind::Buyer,
        Confirm | Reject | AcceptCancel | RejectCancel => ActorKind::Seller,
        PaymentSucceeded => ActorKind::System,
    }
}

/// 时间线描述
pub fn describe(action: OrderAction) -> &'static str {
    use OrderAction::*;
    match action {
        CancelOrder => "Buyer cancelled the order before payment",
        PaymentSucceeded => "Payment confirmed",
        Confirm => "Seller accepted the order",
        Reject => "Seller rejected the order",
        CancelRequest => "Buyer requested cancellation",
        AcceptCancel => "Seller accepted the cancellation request",
        RejectCancel => "Seller rejected the cancellation request",
        MarkReceived => "Buyer confirmed delivery",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderAction::*;
    use OrderStatus::*;

    const ALL_STATUSES: [OrderStatus; 7] = [
        AwaitingPayment,
        AwaitingAccept,
        Accepted,
        CancelRequested,
        Delivered,
        Rejected,
        Cancelled,
    ];
    const ALL_ACTIONS: [OrderAction; 8] = [
        CancelOrder,
        PaymentSucceeded,
        Confirm,
        Reject,
        CancelRequest,
        AcceptCancel,
        RejectCancel,
        MarkReceived,
    ];

    #[test]
    fn test_legal_edges() {
        assert_eq!(resolve(AwaitingPayment, CancelOrder), Some(Target::To(Cancelled)));
        assert_eq!(resolve(AwaitingPayment, PaymentSucceeded), Some(Target::To(AwaitingAccept)));
        assert_eq!(resolve(AwaitingAccept, Confirm), Some(Target::To(Accepted)));
        assert_eq!(resolve(AwaitingAccept, Reject), Some(Target::To(Rejected)));
        assert_eq!(
            resolve(AwaitingAccept, CancelRequest),
            Some(Target::CaptureAndTo(CancelRequested))
        );
        assert_eq!(
            resolve(Accepted, CancelRequest),
            Some(Target::CaptureAndTo(CancelRequested))
        );
        assert_eq!(resolve(CancelRequested, AcceptCancel), Some(Target::To(Cancelled)));
        assert_eq!(resolve(CancelRequested, RejectCancel), Some(Target::RestorePrior));
        assert_eq!(resolve(Accepted, MarkReceived), Some(Target::To(Delivered)));
    }

    #[test]
    fn test_exactly_nine_legal_edges() {
        let mut legal = 0;
        for status in ALL_STATUSES {
            for action in ALL_ACTIONS {
                if resolve(status, action).is_some() {
                    legal += 1;
                }
            }
        }
        assert_eq!(legal, 9);
    }

    #[test]
    fn test_terminal_statuses_have_no_edges() {
        for status in [Delivered, Rejected, Cancelled] {
            for action in ALL_ACTIONS {
                assert_eq!(resolve(status, action), None, "{status} must be terminal");
            }
        }
    }

    #[test]
    fn test_required_actor() {
        assert_eq!(required_actor(Confirm), ActorKind::Seller);
        assert_eq!(required_actor(RejectCancel), ActorKind::Seller);
        assert_eq!(required_actor(CancelRequest), ActorKind::Buyer);
        assert_eq!(required_actor(MarkReceived), ActorKind::Buyer);
        assert_eq!(required_actor(PaymentSucceeded), ActorKind::System);
    }
}
