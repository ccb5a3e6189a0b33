//! 会话期限调度
//!
//! DelayQueue 常驻任务：新会话的期限由管理器经 channel 送入，
//! 启动时先把扫描到的存量 OPEN 会话全部入队（已过期的立即触发）。
//! 同一订单重复入队无害，expire 本身幂等。

use std::sync::Arc;
use std::time::Duration;

use shared::util::now_millis;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;

use super::PaymentSessionManager;

pub struct ExpiryScheduler {
    rx: mpsc::UnboundedReceiver<(String, i64)>,
    manager: Arc<PaymentSessionManager>,
    /// 启动扫描得到的存量期限
    initial: Vec<(String, i64)>,
}

impl ExpiryScheduler {
    pub fn new(
        rx: mpsc::UnboundedReceiver<(String, i64)>,
        manager: Arc<PaymentSessionManager>,
        initial: Vec<(String, i64)>,
    ) -> Self {
        Self {
            rx,
            manager,
            initial,
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut queue: DelayQueue<String> = DelayQueue::new();
        for (order_id, deadline) in self.initial.drain(..) {
            queue.insert(order_id, until(deadline));
        }
        tracing::info!(pending = queue.len(), "Expiry scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Expiry scheduler shutting down");
                    break;
                }
                scheduled = self.rx.recv() => {
                    match scheduled {
                        Some((order_id, deadline)) => {
                            queue.insert(order_id, until(deadline));
                        }
                        None => break,
                    }
                }
                // 空队列时 poll_expired 立即返回 None，必须守住这条分支
                expired = futures::future::poll_fn(|cx| queue.poll_expired(cx)), if !queue.is_empty() => {
                    if let Some(expired) = expired {
                        let order_id = expired.into_inner();
                        if let Err(e) = self.manager.expire(&order_id).await {
                            tracing::error!(%order_id, error = %e, "Session expiry failed");
                        }
                    }
                }
            }
        }
    }
}

fn until(deadline_millis: i64) -> Duration {
    let remaining = deadline_millis - now_millis();
    if remaining > 0 {
        Duration::from_millis(remaining as u64)
    } else {
        Duration::ZERO
    }
}
