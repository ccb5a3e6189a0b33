//! 提交后副作用队列
//!
//! 状态流转提交成功后才入队；副作用失败绝不回滚已提交的流转，
//! 由后台 worker 以指数退避重试，超过上限则记日志弃置。
//! 任务自带订单快照，重启丢失队列内容是可接受的（下游幂等）。

use std::sync::Arc;
use std::time::Duration;

use shared::models::Order;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{InventoryService, PaymentGateway};

/// 最大重试次数（不含首次尝试）
const MAX_RETRY_COUNT: u32 = 3;
/// 重试基准间隔（秒）
const RETRY_BASE_SECS: u64 = 5;
/// 重试间隔上限（秒）
const RETRY_CAP_SECS: u64 = 60;

/// 提交后副作用
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// 订单创建后预占库存
    ReserveInventory(Order),
    /// 订单终止（CANCELLED / REJECTED）后回补库存
    RestoreInventory(Order),
    /// 已支付订单终止后调度退款
    ScheduleRefund(Order),
}

impl SideEffect {
    fn kind(&self) -> &'static str {
        match self {
            SideEffect::ReserveInventory(_) => "reserve_inventory",
            SideEffect::RestoreInventory(_) => "restore_inventory",
            SideEffect::ScheduleRefund(_) => "schedule_refund",
        }
    }

    fn order_id(&self) -> &str {
        match self {
            SideEffect::ReserveInventory(o)
            | SideEffect::RestoreInventory(o)
            | SideEffect::ScheduleRefund(o) => &o.order_id,
        }
    }
}

/// 副作用入队端 - 提交路径持有的克隆句柄
#[derive(Clone)]
pub struct SideEffectQueue {
    tx: mpsc::UnboundedSender<SideEffect>,
}

impl SideEffectQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SideEffect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 入队一个副作用；worker 已停机时仅记日志
    pub fn enqueue(&self, effect: SideEffect) {
        let kind = effect.kind();
        let order_id = effect.order_id().to_string();
        if self.tx.send(effect).is_err() {
            tracing::error!(%order_id, kind, "Side effect dropped: worker is gone");
        } else {
            tracing::debug!(%order_id, kind, "Side effect enqueued");
        }
    }
}

/// 副作用执行器 - 常驻后台任务
pub struct SideEffectWorker {
    rx: mpsc::UnboundedReceiver<SideEffect>,
    gateway: Arc<dyn PaymentGateway>,
    inventory: Arc<dyn InventoryService>,
}

impl SideEffectWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<SideEffect>,
        gateway: Arc<dyn PaymentGateway>,
        inventory: Arc<dyn InventoryService>,
    ) -> Self {
        Self {
            rx,
            gateway,
            inventory,
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Side effect worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Side effect worker shutting down");
                    break;
                }
                effect = self.rx.recv() => {
                    match effect {
                        Some(effect) => self.execute_with_retry(effect, &shutdown).await,
                        None => break,
                    }
                }
            }
        }
    }

    async fn execute_with_retry(&self, effect: SideEffect, shutdown: &CancellationToken) {
        let kind = effect.kind();
        let order_id = effect.order_id().to_string();

        let mut attempt: u32 = 0;
        loop {
            match self.execute(&effect).await {
                Ok(()) => {
                    tracing::info!(%order_id, kind, "Side effect completed");
                    return;
                }
                Err(e) if attempt < MAX_RETRY_COUNT => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    tracing::warn!(
                        %order_id, kind, attempt, error = %e,
                        "Side effect failed, retrying in {}s", delay.as_secs()
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(
                        %order_id, kind, error = %e,
                        "Side effect abandoned after {} retries", MAX_RETRY_COUNT
                    );
                    return;
                }
            }
        }
    }

    async fn execute(&self, effect: &SideEffect) -> Result<(), String> {
        match effect {
            SideEffect::ReserveInventory(order) => self.inventory.reserve(order).await,
            SideEffect::RestoreInventory(order) => self.inventory.restore(order).await,
            SideEffect::ScheduleRefund(order) => self.gateway.schedule_refund(order).await,
        }
    }
}

/// 指数退避：5s, 10s, 20s... 上限 60s
fn retry_delay(attempt: u32) -> Duration {
    let secs = RETRY_BASE_SECS
        .saturating_mul(1u64 << (attempt.saturating_sub(1).min(10)))
        .min(RETRY_CAP_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use shared::models::OrderStatus;
    use shared::util::now_millis;

    use crate::services::gateway::mock::MockGateway;
    use crate::services::inventory::mock::MockInventory;

    #[test]
    fn test_retry_delay_backoff() {
        assert_eq!(retry_delay(1), Duration::from_secs(5));
        assert_eq!(retry_delay(2), Duration::from_secs(10));
        assert_eq!(retry_delay(3), Duration::from_secs(20));
        assert_eq!(retry_delay(10), Duration::from_secs(60));
    }

    fn cancelled_order() -> Order {
        let now = now_millis();
        Order {
            order_id: "ord-retry".to_string(),
            buyer_id: "buyer-1".to_string(),
            seller_id: "seller-1".to_string(),
            items: vec![],
            subtotal: 0,
            shipping_fee: 0,
            discount: 0,
            total: 0,
            status: OrderStatus::Cancelled,
            prior_status: None,
            shipping_address: "1 Example Street".to_string(),
            shipping_method: "standard".to_string(),
            note: None,
            created_at: now,
            updated_at: now,
            expires_at: None,
            timeline: vec![],
        }
    }

    // 暂停时钟下 sleep 自动快进，5s 退避即时走完
    #[tokio::test(start_paused = true)]
    async fn test_transient_inventory_failure_is_retried() {
        let gateway = Arc::new(MockGateway::default());
        let inventory = Arc::new(MockInventory::default());
        inventory.fail_next.store(true, Ordering::SeqCst);

        let (queue, rx) = SideEffectQueue::new();
        let worker = SideEffectWorker::new(
            rx,
            gateway as Arc<dyn PaymentGateway>,
            inventory.clone() as Arc<dyn InventoryService>,
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        queue.enqueue(SideEffect::RestoreInventory(cancelled_order()));

        let mut landed = false;
        for _ in 0..100 {
            if inventory
                .restored
                .lock()
                .unwrap()
                .iter()
                .any(|id| id == "ord-retry")
            {
                landed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(landed, "restore must land after the transient failure");
        // 首次尝试失败，重试一次成功
        assert!(!inventory.fail_next.load(Ordering::SeqCst));
        assert_eq!(inventory.restored.lock().unwrap().len(), 1);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
