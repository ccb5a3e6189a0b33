//! 核心模块：配置、状态、后台任务与服务器启动

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
