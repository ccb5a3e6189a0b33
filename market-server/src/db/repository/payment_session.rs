//! Payment Session Repository
//!
//! 会话与订单 1:1，按 `order_id` 键控；开启新会话覆盖同订单的
//! 历史（已过期）会话记录。

use super::{BaseRepository, RepoError, RepoResult};
use shared::models::{PaymentSession, SessionStatus};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct PaymentSessionRepository {
    base: BaseRepository,
}

impl PaymentSessionRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Insert or replace the session bound to an order
    pub async fn upsert(&self, session: &PaymentSession) -> RepoResult<PaymentSession> {
        // 1:1 per order — remove any previous (non-open) session first
        self.base
            .db()
            .query("DELETE payment_session WHERE order_id = $order_id")
            .bind(("order_id", session.order_id.clone()))
            .await?;

        let created: Option<PaymentSession> = self
            .base
            .db()
            .create("payment_session")
            .content(session.clone())
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to persist payment session".to_string()))
    }

    /// Find the session bound to an order
    pub async fn find_by_order_id(&self, order_id: &str) -> RepoResult<Option<PaymentSession>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM payment_session WHERE order_id = $order_id LIMIT 1")
            .bind(("order_id", order_id.to_string()))
            .await?;
        let sessions: Vec<PaymentSession> = result.take(0)?;
        Ok(sessions.into_iter().next())
    }

    /// Update a session's status
    pub async fn set_status(&self, order_id: &str, status: SessionStatus) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE payment_session SET status = $status WHERE order_id = $order_id")
            .bind(("status", status))
            .bind(("order_id", order_id.to_string()))
            .await?;
        Ok(())
    }

    /// All sessions still awaiting payment (startup deadline recovery)
    pub async fn find_open(&self) -> RepoResult<Vec<PaymentSession>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM payment_session WHERE status = $status")
            .bind(("status", SessionStatus::Open))
            .await?;
        let sessions: Vec<PaymentSession> = result.take(0)?;
        Ok(sessions)
    }
}
