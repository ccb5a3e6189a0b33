//! 下游协作方与提交后副作用
//!
//! - **gateway**: 支付网关客户端（创建结账会话）
//! - **inventory**: 库存服务客户端（预占 / 回补）
//! - **side_effects**: 提交后副作用队列（带退避重试的后台 worker）
//!
//! 所有协作方都以 trait 出现，HTTP 实现用于生产，mock 用于测试。

pub mod gateway;
pub mod inventory;
pub mod side_effects;

pub use gateway::{CheckoutArtifacts, PaymentGateway};
pub use inventory::InventoryService;
pub use side_effects::{SideEffect, SideEffectQueue, SideEffectWorker};
