//! 数据模型
//!
//! 订单、支付会话和角色的共享模型定义。
//! 服务端持久化与客户端反序列化使用同一套结构。

pub mod order;
pub mod payment_session;
pub mod role;

pub use order::{Order, OrderAction, OrderItem, OrderStatus, TimelineEntry};
pub use payment_session::{PaymentSession, SESSION_EXPIRE_IN_SECS, SessionStatus};
pub use role::Role;
