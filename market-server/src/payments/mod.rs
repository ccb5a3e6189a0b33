//! 支付会话
//!
//! 每笔 AWAITING_PAYMENT 订单最多一个 OPEN 会话（DashMap 竞技场 +
//! 持久化双保险）。会话有 900 秒硬期限，由 [`expiry`] 的 DelayQueue
//! 调度；重启后从持久化会话重建定时器，过期判定以 created_at +
//! expire_in 计算，不依赖进程存活。
//!
//! 会话结果只有两个入口：网关回调的 resolve_success 与定时器的
//! expire，两者都幂等。

pub mod expiry;
pub mod manager;

pub use expiry::ExpiryScheduler;
pub use manager::PaymentSessionManager;
