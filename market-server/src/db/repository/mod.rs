//! Repository Module
//!
//! Provides persistence operations for SurrealDB tables.
//!
//! 记录使用应用层生成的业务键（`order_id`）定位，不依赖 SurrealDB
//! 的内部记录 ID；订单时间线作为内嵌 append-only 列表存储在订单
//! 文档上（单订单写入量低，无需独立日志表）。

pub mod order;
pub mod payment_session;

pub use order::OrderRepository;
pub use payment_session::PaymentSessionRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
