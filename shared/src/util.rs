//! 通用工具

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 生成订单 ID
///
/// UUID v4 simple 形式，带 `ord_` 前缀便于日志排查。
pub fn new_order_id() -> String {
    format!("ord_{}", uuid::Uuid::new_v4().simple())
}

/// 生成连接 ID（推送通道每条连接一个）
pub fn new_connection_id() -> String {
    format!("conn_{}", uuid::Uuid::new_v4().simple())
}
