//! 支付网关客户端
//!
//! 开启支付会话时同步调用；网关不可用时错误直接回传给调用方，
//! 订单保持 AWAITING_PAYMENT，可重新开启会话。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::Order;

/// 网关返回的结账产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutArtifacts {
    pub checkout_url: String,
    pub qr_code: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 在网关侧创建结账会话
    async fn create_checkout(&self, order: &Order) -> Result<CheckoutArtifacts, String>;

    /// 调度退款（幂等，网关按 order_id 去重）
    async fn schedule_refund(&self, order: &Order) -> Result<(), String>;
}

/// 生产实现 - HTTP 网关
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    /// 结账会话有效期提示（秒），与本地会话期限一致
    session_ttl_secs: i64,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    order_id: &'a str,
    amount: i64,
    expire_in: i64,
}

#[derive(Debug, Serialize)]
struct RefundRequest<'a> {
    order_id: &'a str,
    amount: i64,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, session_ttl_secs: i64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            session_ttl_secs,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout(&self, order: &Order) -> Result<CheckoutArtifacts, String> {
        let url = format!("{}/checkout", self.base_url);
        let body = CheckoutRequest {
            order_id: &order.order_id,
            amount: order.total,
            expire_in: self.session_ttl_secs,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("gateway request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("gateway returned status {}", response.status()));
        }

        response
            .json::<CheckoutArtifacts>()
            .await
            .map_err(|e| format!("gateway response malformed: {e}"))
    }

    async fn schedule_refund(&self, order: &Order) -> Result<(), String> {
        let url = format!("{}/refund", self.base_url);
        let body = RefundRequest {
            order_id: &order.order_id,
            amount: order.total,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("gateway request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("gateway returned status {}", response.status()));
        }
        Ok(())
    }
}

/// 测试支持：可注入故障的内存网关
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// 测试用网关 - 记录调用并可切换为不可用
    #[derive(Default)]
    pub struct MockGateway {
        pub unavailable: AtomicBool,
        pub checkout_calls: AtomicUsize,
        pub refunds: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_checkout(&self, order: &Order) -> Result<CheckoutArtifacts, String> {
            self.checkout_calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err("connection refused".to_string());
            }
            Ok(CheckoutArtifacts {
                checkout_url: format!("https://pay.example.com/c/{}", order.order_id),
                qr_code: format!("data:image/png;base64,{}", order.order_id),
            })
        }

        async fn schedule_refund(&self, order: &Order) -> Result<(), String> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err("connection refused".to_string());
            }
            self.refunds
                .lock()
                .map_err(|_| "poisoned".to_string())?
                .push(order.order_id.clone());
            Ok(())
        }
    }
}
