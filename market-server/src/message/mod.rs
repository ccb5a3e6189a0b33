//! 推送通道
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 ConnectionRegistry                    │
//! │   user_id ──▶ { conn_id ──▶ UnboundedSender }        │
//! └──────────────────────┬───────────────────────────────┘
//!                        │
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//!       Notifier (提交路径)      keepalive (周期 PING)
//! ```
//!
//! 扇出在提交路径上同步执行，保证同一订单的事件按提交顺序送达；
//! 送达本身是 at-most-once、尽力而为——死连接直接剔除，不重试。

pub mod notifier;
pub mod registry;

pub use notifier::Notifier;
pub use registry::ConnectionRegistry;
