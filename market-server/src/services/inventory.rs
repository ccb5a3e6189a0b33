//! 库存服务客户端
//!
//! 预占发生在订单创建后、回补发生在 CANCELLED / REJECTED 提交后，
//! 两者都走副作用队列异步重试，不阻塞提交路径。

use async_trait::async_trait;
use serde::Serialize;
use shared::models::Order;

#[async_trait]
pub trait InventoryService: Send + Sync {
    /// 为订单条目预占库存（幂等，库存侧按 order_id 去重）
    async fn reserve(&self, order: &Order) -> Result<(), String>;

    /// 回补订单条目的库存
    async fn restore(&self, order: &Order) -> Result<(), String>;
}

/// 生产实现 - HTTP 库存服务
pub struct HttpInventoryService {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct StockRequest<'a> {
    order_id: &'a str,
    items: Vec<StockLine<'a>>,
}

#[derive(Debug, Serialize)]
struct StockLine<'a> {
    product_id: &'a str,
    quantity: i32,
}

impl HttpInventoryService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post(&self, path: &str, order: &Order) -> Result<(), String> {
        let url = format!("{}{path}", self.base_url);
        let body = StockRequest {
            order_id: &order.order_id,
            items: order
                .items
                .iter()
                .map(|i| StockLine {
                    product_id: &i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("inventory request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("inventory returned status {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryService for HttpInventoryService {
    async fn reserve(&self, order: &Order) -> Result<(), String> {
        self.post("/reserve", order).await
    }

    async fn restore(&self, order: &Order) -> Result<(), String> {
        self.post("/restore", order).await
    }
}

/// 测试支持：可注入故障的内存库存服务
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// 测试用库存服务 - 记录调用并可注入瞬时失败
    #[derive(Default)]
    pub struct MockInventory {
        pub fail_next: AtomicBool,
        pub reserved: Mutex<Vec<String>>,
        pub restored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InventoryService for MockInventory {
        async fn reserve(&self, order: &Order) -> Result<(), String> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err("inventory temporarily unavailable".to_string());
            }
            self.reserved
                .lock()
                .map_err(|_| "poisoned".to_string())?
                .push(order.order_id.clone());
            Ok(())
        }

        async fn restore(&self, order: &Order) -> Result<(), String> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err("inventory temporarily unavailable".to_string());
            }
            self.restored
                .lock()
                .map_err(|_| "poisoned".to_string())?
                .push(order.order_id.clone());
            Ok(())
        }
    }
}
