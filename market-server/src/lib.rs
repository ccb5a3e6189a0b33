//! Market Server
//!
//! 市集订单服务：订单状态机、支付会话、取消协商与推送扇出。
//!
//! # 模块
//!
//! - [`core`] - 配置、状态、后台任务与服务器启动
//! - [`orders`] - 订单状态机（闭合流转表 + 执行服务）
//! - [`payments`] - 支付会话管理与期限调度
//! - [`message`] - 推送连接注册表与事件扇出
//! - [`services`] - 下游协作方与提交后副作用
//! - [`auth`] - JWT 验签与 CurrentUser 提取器
//! - [`db`] - 嵌入式 SurrealDB 与仓储层
//! - [`api`] - HTTP 处理器

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod message;
pub mod orders;
pub mod payments;
pub mod routes;
pub mod services;
pub mod utils;

pub use crate::core::{BackgroundTasks, Config, ServerState};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();
    utils::logger::init_logger();
}
