//! Order Repository

use super::{BaseRepository, RepoError, RepoResult};
use shared::models::{Order, OrderStatus, Role};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a freshly created order
    pub async fn create(&self, order: &Order) -> RepoResult<Order> {
        if self.find_by_order_id(&order.order_id).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Order {} already exists",
                order.order_id
            )));
        }

        let created: Option<Order> = self
            .base
            .db()
            .create(TABLE)
            .content(order.clone())
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find an order by its business key
    pub async fn find_by_order_id(&self, order_id: &str) -> RepoResult<Option<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM order WHERE order_id = $order_id LIMIT 1")
            .bind(("order_id", order_id.to_string()))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        Ok(orders.into_iter().next())
    }

    /// Replace the stored order document
    ///
    /// 调用方必须持有该订单的锁（见 OrderService 的锁竞技场），
    /// 保证读-改-写不交叉。
    pub async fn update(&self, order: &Order) -> RepoResult<Order> {
        let mut result = self
            .base
            .db()
            .query("UPDATE order CONTENT $order WHERE order_id = $order_id")
            .bind(("order", order.clone()))
            .bind(("order_id", order.order_id.clone()))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        orders
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", order.order_id)))
    }

    /// Update only the payment deadline field (not a status transition)
    pub async fn set_expires_at(&self, order_id: &str, expires_at: Option<i64>) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE order SET expires_at = $expires_at, updated_at = $now WHERE order_id = $order_id")
            .bind(("expires_at", expires_at))
            .bind(("now", shared::util::now_millis()))
            .bind(("order_id", order_id.to_string()))
            .await?;
        Ok(())
    }

    /// List orders visible to an actor, newest first
    ///
    /// Buyer sees own purchases, seller sees own sales, admin sees all.
    pub async fn list_for_actor(
        &self,
        actor_id: &str,
        role: Role,
        status: Option<OrderStatus>,
    ) -> RepoResult<Vec<Order>> {
        let owner_clause = match role {
            Role::Buyer => "buyer_id = $actor_id",
            Role::Seller => "seller_id = $actor_id",
            Role::Admin => "$actor_id = $actor_id",
        };
        let status_clause = if status.is_some() {
            " AND status = $status"
        } else {
            ""
        };
        let sql = format!(
            "SELECT * FROM order WHERE {}{} ORDER BY created_at DESC",
            owner_clause, status_clause
        );

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("actor_id", actor_id.to_string()));
        if let Some(s) = status {
            query = query.bind(("status", s));
        }

        let orders: Vec<Order> = query.await?.take(0)?;
        Ok(orders)
    }
}
