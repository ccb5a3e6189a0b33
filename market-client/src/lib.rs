//! Market Client
//!
//! 市集订单服务的 Rust 客户端：
//!
//! - [`MarketClient`] - 订单 / 支付会话 API（令牌过期自动单飞刷新 + 重试一次）
//! - [`EventStream`] - 推送通道（WebSocket，PING 自动跳过）
//! - [`TokenSource`] / [`TokenManager`] - 凭证获取与单飞刷新
//!
//! # 使用示例
//!
//! ```ignore
//! let client = MarketClient::new(ClientConfig::new("http://localhost:3000"), source)?;
//! let created = client.create_order(&request).await?;
//! client.transition(&created.order.order_id, OrderAction::Confirm).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod token;

pub use client::MarketClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use events::EventStream;
pub use http::HttpClient;
pub use token::{TokenManager, TokenSource};
