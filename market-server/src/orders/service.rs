//! 流转执行服务
//!
//! 同一订单的并发流转由锁竞技场串行化：请求先取该订单的锁，
//! 在锁内重读当前状态再判定合法性。两个并发的相同动作中，
//! 后进锁的一方会看到已更新的状态并得到 InvalidTransition——
//! 这是幂等语义的实现基础，不依赖数据库事务。

use std::sync::Arc;

use dashmap::DashMap;
use shared::models::{Order, OrderAction, OrderStatus, Role, TimelineEntry};
use shared::request::CreateOrderRequest;
use shared::util::{new_order_id, now_millis};
use tokio::sync::Mutex;

use crate::db::repository::OrderRepository;
use crate::message::Notifier;
use crate::services::{SideEffect, SideEffectQueue};

use super::transition::{self, ActorKind, Target};
use super::{Actor, OrderError};

pub struct OrderService {
    repo: OrderRepository,
    /// order_id -> 流转锁；终态提交后释放无等待者的条目
    locks: DashMap<String, Arc<Mutex<()>>>,
    notifier: Notifier,
    side_effects: SideEffectQueue,
}

impl OrderService {
    pub fn new(repo: OrderRepository, notifier: Notifier, side_effects: SideEffectQueue) -> Self {
        Self {
            repo,
            locks: DashMap::new(),
            notifier,
            side_effects,
        }
    }

    fn lock_for(&self, order_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ===== 创建 =====

    /// 创建订单：计价、落库、预占库存
    ///
    /// 金额全程使用最小货币单位整数，subtotal 为行小计之和，
    /// total = subtotal + shipping_fee - discount。
    pub async fn create(
        &self,
        buyer_id: &str,
        request: CreateOrderRequest,
    ) -> Result<Order, OrderError> {
        let now = now_millis();
        let subtotal: i64 = request.items.iter().map(|i| i.line_total()).sum();
        let total = subtotal + request.shipping_fee - request.discount;

        let order = Order {
            order_id: new_order_id(),
            buyer_id: buyer_id.to_string(),
            seller_id: request.seller_id,
            items: request.items,
            subtotal,
            shipping_fee: request.shipping_fee,
            discount: request.discount,
            total,
            status: OrderStatus::AwaitingPayment,
            prior_status: None,
            shipping_address: request.shipping_address,
            shipping_method: request.shipping_method,
            note: request.note,
            created_at: now,
            updated_at: now,
            expires_at: None,
            timeline: vec![TimelineEntry {
                status: OrderStatus::AwaitingPayment,
                timestamp: now,
                actor_id: buyer_id.to_string(),
                description: "Order created".to_string(),
            }],
        };

        let created = self.repo.create(&order).await?;
        tracing::info!(order_id = %created.order_id, total = created.total, "Order created");

        self.side_effects
            .enqueue(SideEffect::ReserveInventory(created.clone()));
        Ok(created)
    }

    // ===== 流转 =====

    /// 执行一次状态流转
    ///
    /// 锁内重读 → 参与方检查 → 授权 → 查表 → 提交 → 提交后副作用与推送。
    /// 副作用与推送在持锁期间执行，保证同订单事件按提交顺序送达。
    pub async fn apply_transition(
        &self,
        actor: &Actor,
        order_id: &str,
        action: OrderAction,
    ) -> Result<Order, OrderError> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self
            .repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;

        // 与读路径一致：非参与方不应得知订单存在，也不应探知其状态
        if let Actor::User { id, role } = actor {
            if *role != Role::Admin && !order.is_participant(id) {
                return Err(OrderError::NotFound {
                    order_id: order_id.to_string(),
                });
            }
        }

        self.authorize(actor, &order, action)?;

        let target = transition::resolve(order.status, action).ok_or_else(|| {
            OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                current: order.status,
                action: action.to_string(),
            }
        })?;

        let next = match target {
            Target::To(status) => {
                order.prior_status = None;
                status
            }
            Target::CaptureAndTo(status) => {
                order.prior_status = Some(order.status);
                status
            }
            Target::RestorePrior => {
                // 只有经 CaptureAndTo 进入的状态才可能走到这里
                order
                    .prior_status
                    .take()
                    .ok_or_else(|| OrderError::InvalidTransition {
                        order_id: order_id.to_string(),
                        current: order.status,
                        action: action.to_string(),
                    })?
            }
        };

        let was = order.status;
        let now = now_millis();
        order.status = next;
        order.updated_at = now;
        if was == OrderStatus::AwaitingPayment {
            // 支付期限只对 AWAITING_PAYMENT 有意义
            order.expires_at = None;
        }
        order.timeline.push(TimelineEntry {
            status: next,
            timestamp: now,
            actor_id: actor.actor_id().to_string(),
            description: transition::describe(action).to_string(),
        });

        let committed = self.repo.update(&order).await?;
        tracing::info!(
            order_id = %committed.order_id,
            from = %was,
            to = %committed.status,
            action = %action,
            actor = %actor.actor_id(),
            "Order transition committed"
        );

        self.after_commit(&committed, was, action);

        if committed.status.is_terminal() {
            // 终态订单不再流转，释放竞技场条目；仍有等待者（Arc 另有克隆）时保留
            drop(_guard);
            self.locks
                .remove_if(order_id, |_, entry| Arc::strong_count(entry) <= 2);
        }
        Ok(committed)
    }

    /// 授权检查：动作归属方必须与操作者匹配；管理员可代行用户动作
    fn authorize(&self, actor: &Actor, order: &Order, action: OrderAction) -> Result<(), OrderError> {
        let required = transition::required_actor(action);
        let allowed = match (required, actor) {
            // 支付确认只能由支付会话驱动，任何用户（含管理员）不可伪造
            (ActorKind::System, Actor::System) => true,
            (ActorKind::System, Actor::User { .. }) => false,
            (_, Actor::System) => false,
            (_, Actor::User { role: Role::Admin, .. }) => true,
            (ActorKind::Buyer, Actor::User { id, role: Role::Buyer }) => id == &order.buyer_id,
            (ActorKind::Seller, Actor::User { id, role: Role::Seller }) => id == &order.seller_id,
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(OrderError::Unauthorized {
                order_id: order.order_id.clone(),
                actor_id: actor.actor_id().to_string(),
                action: action.to_string(),
            })
        }
    }

    /// 提交后副作用与推送（失败不回滚，见副作用队列）
    fn after_commit(&self, order: &Order, was: OrderStatus, action: OrderAction) {
        match order.status {
            OrderStatus::Cancelled | OrderStatus::Rejected => {
                self.side_effects
                    .enqueue(SideEffect::RestoreInventory(order.clone()));
                // 未支付即取消的订单无款可退
                let paid = !(was == OrderStatus::AwaitingPayment
                    && action == OrderAction::CancelOrder);
                if paid {
                    self.side_effects
                        .enqueue(SideEffect::ScheduleRefund(order.clone()));
                }
            }
            _ => {}
        }

        self.notifier.order_updated(order);
    }

    // ===== 查询 =====

    /// 按业务键查订单
    pub async fn find(&self, order_id: &str) -> Result<Option<Order>, OrderError> {
        Ok(self.repo.find_by_order_id(order_id).await?)
    }

    /// 参与方 / 管理员视角取单
    pub async fn get_for_actor(
        &self,
        actor_id: &str,
        role: Role,
        order_id: &str,
    ) -> Result<Order, OrderError> {
        let order = self
            .repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;

        if role != Role::Admin && !order.is_participant(actor_id) {
            // 非参与方不应得知订单存在
            return Err(OrderError::NotFound {
                order_id: order_id.to_string(),
            });
        }
        Ok(order)
    }

    /// 按角色列单
    pub async fn list_for_actor(
        &self,
        actor_id: &str,
        role: Role,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.repo.list_for_actor(actor_id, role, status).await?)
    }

    /// 写入支付期限（开启 / 过期支付会话时由会话管理器调用）
    pub async fn set_payment_deadline(
        &self,
        order_id: &str,
        expires_at: Option<i64>,
    ) -> Result<(), OrderError> {
        Ok(self.repo.set_expires_at(order_id, expires_at).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderItem;

    use crate::db::DbService;
    use crate::message::ConnectionRegistry;

    async fn service() -> OrderService {
        let db = DbService::memory().await.unwrap();
        let registry = Arc::new(ConnectionRegistry::new());
        let (queue, _rx) = SideEffectQueue::new();
        OrderService::new(
            OrderRepository::new(db.db.clone()),
            Notifier::new(registry),
            queue,
        )
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            seller_id: "seller-1".to_string(),
            items: vec![OrderItem {
                product_id: "p-1".to_string(),
                name: "Ceramic mug".to_string(),
                price: 1_000,
                quantity: 1,
                image: None,
            }],
            shipping_fee: 0,
            discount: 0,
            shipping_address: "1 Example Street".to_string(),
            shipping_method: "standard".to_string(),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_terminal_commit_releases_lock_entry() {
        let service = service().await;
        let buyer = Actor::user("buyer-1", Role::Buyer);

        let order = service.create("buyer-1", request()).await.unwrap();
        let cancelled = service
            .apply_transition(&buyer, &order.order_id, OrderAction::CancelOrder)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(
            !service.locks.contains_key(&order.order_id),
            "terminal order must not retain a lock entry"
        );

        // 非终态流转保留锁条目，后续流转复用同一把锁
        let second = service.create("buyer-1", request()).await.unwrap();
        service
            .apply_transition(&Actor::System, &second.order_id, OrderAction::PaymentSucceeded)
            .await
            .unwrap();
        assert!(service.locks.contains_key(&second.order_id));
    }
}
