//! Market API client
//!
//! 每个调用自动附带当前令牌；收到令牌过期（E3003）时触发单飞
//! 刷新并重试一次，其余错误原样上抛。

use std::sync::Arc;

use serde::de::DeserializeOwned;
use shared::ApiResponse;
use shared::models::{Order, OrderAction, OrderStatus, PaymentSession};
use shared::request::{CreateOrderRequest, TransitionRequest};
use shared::response::OrderWithSession;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::EventStream;
use crate::http::HttpClient;
use crate::token::{TokenManager, TokenSource};

pub struct MarketClient {
    config: ClientConfig,
    http: HttpClient,
    tokens: Arc<TokenManager>,
}

impl MarketClient {
    pub fn new(config: ClientConfig, source: Arc<dyn TokenSource>) -> ClientResult<Self> {
        let http = HttpClient::new(&config)?;
        Ok(Self {
            config,
            http,
            tokens: Arc::new(TokenManager::new(source)),
        })
    }

    // ===== 带刷新重试的请求原语 =====

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let token = self.tokens.current_or_refresh().await?;
        match self.http.get::<T>(path, Some(&token)).await {
            Err(ClientError::TokenExpired) => {
                let token = self.tokens.refresh().await?;
                self.http.get(path, Some(&token)).await
            }
            other => other,
        }
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let token = self.tokens.current_or_refresh().await?;
        match self.http.post::<T, B>(path, body, Some(&token)).await {
            Err(ClientError::TokenExpired) => {
                let token = self.tokens.refresh().await?;
                self.http.post(path, body, Some(&token)).await
            }
            other => other,
        }
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let token = self.tokens.current_or_refresh().await?;
        match self.http.post_empty::<T>(path, Some(&token)).await {
            Err(ClientError::TokenExpired) => {
                let token = self.tokens.refresh().await?;
                self.http.post_empty(path, Some(&token)).await
            }
            other => other,
        }
    }

    fn unwrap_data<T>(envelope: ApiResponse<T>, what: &str) -> ClientResult<T> {
        envelope
            .data
            .ok_or_else(|| ClientError::InvalidResponse(format!("Missing {what} data")))
    }

    // ========== Order API ==========

    /// 创建订单（随单开启支付会话）
    pub async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<OrderWithSession> {
        let envelope: ApiResponse<OrderWithSession> =
            self.post("/api/orders", request).await?;
        Self::unwrap_data(envelope, "order")
    }

    /// 列出当前用户可见订单
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> ClientResult<Vec<Order>> {
        let path = match status {
            Some(status) => format!("/api/orders?status={status}"),
            None => "/api/orders".to_string(),
        };
        let envelope: ApiResponse<Vec<Order>> = self.get(&path).await?;
        Self::unwrap_data(envelope, "orders")
    }

    /// 取单
    pub async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        let envelope: ApiResponse<Order> = self.get(&format!("/api/orders/{order_id}")).await?;
        Self::unwrap_data(envelope, "order")
    }

    /// 执行状态流转
    pub async fn transition(&self, order_id: &str, action: OrderAction) -> ClientResult<Order> {
        let envelope: ApiResponse<Order> = self
            .post(
                &format!("/api/orders/{order_id}/transition"),
                &TransitionRequest { action },
            )
            .await?;
        Self::unwrap_data(envelope, "order")
    }

    // ========== Payment Session API ==========

    /// 重开支付会话
    pub async fn open_payment_session(&self, order_id: &str) -> ClientResult<PaymentSession> {
        let envelope: ApiResponse<PaymentSession> = self
            .post_empty(&format!("/api/orders/{order_id}/payment-session"))
            .await?;
        Self::unwrap_data(envelope, "payment session")
    }

    /// 查询订单当前支付会话
    pub async fn get_payment_session(&self, order_id: &str) -> ClientResult<PaymentSession> {
        let envelope: ApiResponse<PaymentSession> = self
            .get(&format!("/api/orders/{order_id}/payment-session"))
            .await?;
        Self::unwrap_data(envelope, "payment session")
    }

    // ========== Push Channel ==========

    /// 连接推送通道（PING 在流内自动跳过）
    pub async fn subscribe_events(&self) -> ClientResult<EventStream> {
        let token = self.tokens.current_or_refresh().await?;
        EventStream::connect(&self.config, &token).await
    }
}
