//! HTTP API
//!
//! 每个子模块暴露一个 `router()`，由 [`crate::routes`] 汇总挂载。
//! 认证经由 [`crate::auth::CurrentUser`] 提取器完成，处理器拿到的
//! 一律是已验签的 (actor_id, role)。

pub mod events;
pub mod health;
pub mod orders;
pub mod payments;
