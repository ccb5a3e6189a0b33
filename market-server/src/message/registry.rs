//! 连接注册表
//!
//! 一个用户可同时持有多条活动连接（多端、多开页面），注册表按
//! user_id 维护连接句柄集合，连接建立/断开时增删——绝不是
//! 每用户一个 socket 引用。

use dashmap::DashMap;
use shared::message::PushEvent;
use shared::util::new_connection_id;
use tokio::sync::mpsc;

/// 连接注册表 - 推送扇出的目标集合
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// user_id -> (conn_id -> sender)
    connections: DashMap<String, DashMap<String, mpsc::UnboundedSender<PushEvent>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// 注册一条新连接，返回 (连接 ID, 事件接收端)
    pub fn register(&self, user_id: &str) -> (String, mpsc::UnboundedReceiver<PushEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = new_connection_id();
        self.connections
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id.clone(), tx);
        tracing::debug!(user = %user_id, conn = %conn_id, "Connection registered");
        (conn_id, rx)
    }

    /// 注销连接；用户最后一条连接断开时清理整个条目
    pub fn unregister(&self, user_id: &str, conn_id: &str) {
        if let Some(conns) = self.connections.get(user_id) {
            conns.remove(conn_id);
        }
        self.connections
            .remove_if(user_id, |_, conns| conns.is_empty());
        tracing::debug!(user = %user_id, conn = %conn_id, "Connection unregistered");
    }

    /// 向某用户的所有活动连接推送事件，返回送达连接数
    ///
    /// 发送失败说明接收端已掉线，顺手剔除该连接。
    pub fn push_to_user(&self, user_id: &str, event: &PushEvent) -> usize {
        let Some(conns) = self.connections.get(user_id) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead: Vec<String> = Vec::new();
        for entry in conns.iter() {
            if entry.value().send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(entry.key().clone());
            }
        }
        for conn_id in dead {
            conns.remove(&conn_id);
        }
        delivered
    }

    /// 向所有连接发送保活事件
    pub fn ping_all(&self) {
        for user in self.connections.iter() {
            self.push_to_user(user.key(), &PushEvent::ping());
        }
    }

    /// 某用户当前活动连接数
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.connections
            .get(user_id)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}
