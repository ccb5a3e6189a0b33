//! 支付会话管理器

use std::sync::Arc;

use dashmap::DashMap;
use shared::message::PushEventType;
use shared::models::{Order, OrderAction, OrderStatus, PaymentSession, SessionStatus};
use shared::util::now_millis;
use tokio::sync::mpsc;

use crate::db::repository::PaymentSessionRepository;
use crate::message::Notifier;
use crate::orders::{Actor, OrderError, OrderService};
use crate::services::PaymentGateway;

/// 过期调度指令：(order_id, deadline_millis)
pub type ExpiryHandle = mpsc::UnboundedSender<(String, i64)>;

pub struct PaymentSessionManager {
    repo: PaymentSessionRepository,
    orders: Arc<OrderService>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    /// 单飞竞技场：order_id 在表中即存在 OPEN 会话
    open_handles: DashMap<String, ()>,
    /// 会话有效期（秒），来自配置 SESSION_TTL_SECS
    session_ttl_secs: i64,
    expiry_tx: ExpiryHandle,
}

impl PaymentSessionManager {
    pub fn new(
        repo: PaymentSessionRepository,
        orders: Arc<OrderService>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        session_ttl_secs: i64,
        expiry_tx: ExpiryHandle,
    ) -> Self {
        Self {
            repo,
            orders,
            gateway,
            notifier,
            open_handles: DashMap::new(),
            session_ttl_secs,
            expiry_tx,
        }
    }

    // ===== 开启 =====

    /// 为订单开启支付会话
    ///
    /// 网关不可用时错误同步回传，订单留在 AWAITING_PAYMENT，可重试。
    pub async fn open(&self, order_id: &str) -> Result<PaymentSession, OrderError> {
        let order = self.require_order(order_id).await?;
        if order.status != OrderStatus::AwaitingPayment {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                current: order.status,
                action: "open_payment_session".to_string(),
            });
        }

        // 竞技场占位；并发 open 在这里分出胜负
        match self.open_handles.entry(order_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(OrderError::SessionConflict {
                    order_id: order_id.to_string(),
                });
            }
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(());
            }
        }

        // 持久层双保险：竞技场在重启后是空的
        match self.repo.find_by_order_id(order_id).await {
            Ok(Some(existing)) if existing.is_open() => {
                return Err(OrderError::SessionConflict {
                    order_id: order_id.to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                self.open_handles.remove(order_id);
                return Err(e.into());
            }
        }

        let artifacts = match self.gateway.create_checkout(&order).await {
            Ok(a) => a,
            Err(message) => {
                self.open_handles.remove(order_id);
                tracing::warn!(%order_id, %message, "Payment gateway unavailable");
                return Err(OrderError::UpstreamUnavailable {
                    order_id: order_id.to_string(),
                    message,
                });
            }
        };

        let session = PaymentSession {
            order_id: order_id.to_string(),
            checkout_url: artifacts.checkout_url,
            qr_code: artifacts.qr_code,
            created_at: now_millis(),
            expire_in: self.session_ttl_secs,
            status: SessionStatus::Open,
        };

        let persisted = match self.repo.upsert(&session).await {
            Ok(s) => s,
            Err(e) => {
                self.open_handles.remove(order_id);
                return Err(e.into());
            }
        };

        let deadline = persisted.deadline_millis();
        self.orders
            .set_payment_deadline(order_id, Some(deadline))
            .await?;
        if self
            .expiry_tx
            .send((order_id.to_string(), deadline))
            .is_err()
        {
            tracing::error!(%order_id, "Expiry scheduler is gone, deadline will only fire after restart");
        }

        tracing::info!(%order_id, deadline, "Payment session opened");
        self.notifier.session_event(
            PushEventType::QrCreated,
            &order,
            Some(&persisted.checkout_url),
            Some(&persisted.qr_code),
        );
        Ok(persisted)
    }

    // ===== 结果 =====

    /// 网关确认支付成功（幂等：重复回调只流转一次）
    ///
    /// EXPIRED 会话也接受成功：真实网关的回调可能晚于本地期限。
    pub async fn resolve_success(&self, order_id: &str) -> Result<(), OrderError> {
        let session = self
            .repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;

        if session.status == SessionStatus::Succeeded {
            tracing::debug!(%order_id, "Duplicate payment confirmation ignored");
            return Ok(());
        }

        self.repo
            .set_status(order_id, SessionStatus::Succeeded)
            .await?;
        self.open_handles.remove(order_id);

        match self
            .orders
            .apply_transition(&Actor::System, order_id, OrderAction::PaymentSucceeded)
            .await
        {
            Ok(order) => {
                self.notifier
                    .session_event(PushEventType::PaymentSuccess, &order, None, None);
                Ok(())
            }
            // 订单已离开 AWAITING_PAYMENT（如买家刚取消）：会话标记保留，订单不动
            Err(OrderError::InvalidTransition { current, .. }) => {
                tracing::warn!(
                    %order_id, %current,
                    "Payment confirmed but order already left AWAITING_PAYMENT"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 期限到达（幂等：仅 OPEN 会话过期，订单保持 AWAITING_PAYMENT）
    pub async fn expire(&self, order_id: &str) -> Result<(), OrderError> {
        let Some(session) = self.repo.find_by_order_id(order_id).await? else {
            return Ok(());
        };
        if session.status != SessionStatus::Open {
            return Ok(());
        }

        self.repo
            .set_status(order_id, SessionStatus::Expired)
            .await?;
        self.open_handles.remove(order_id);
        self.orders.set_payment_deadline(order_id, None).await?;
        tracing::info!(%order_id, "Payment session expired");

        if let Some(order) = self.orders.find(order_id).await? {
            self.notifier
                .session_event(PushEventType::QrExpired, &order, None, None);
        }
        Ok(())
    }

    /// 查询订单当前会话
    pub async fn find(&self, order_id: &str) -> Result<Option<PaymentSession>, OrderError> {
        Ok(self.repo.find_by_order_id(order_id).await?)
    }

    // ===== 重启恢复 =====

    /// 启动时扫描持久化的 OPEN 会话，重建竞技场并返回待调度期限
    pub async fn scan_open_sessions(&self) -> Result<Vec<(String, i64)>, OrderError> {
        let sessions = self.repo.find_open().await?;
        let mut deadlines = Vec::with_capacity(sessions.len());
        for session in sessions {
            self.open_handles.insert(session.order_id.clone(), ());
            deadlines.push((session.order_id.clone(), session.deadline_millis()));
        }
        tracing::info!(count = deadlines.len(), "Recovered open payment sessions");
        Ok(deadlines)
    }

    async fn require_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.orders
            .find(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })
    }
}
