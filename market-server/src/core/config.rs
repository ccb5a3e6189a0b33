use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATA_DIR | /var/lib/market | 数据目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | GATEWAY_URL | http://localhost:4100 | 支付网关地址 |
/// | GATEWAY_WEBHOOK_SECRET | (dev 默认) | 网关回调共享密钥 |
/// | INVENTORY_URL | http://localhost:4200 | 库存服务地址 |
/// | SESSION_TTL_SECS | 900 | 支付会话有效期（秒） |
/// | PING_INTERVAL_SECS | 30 | 推送通道保活间隔（秒） |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// DATA_DIR=/data/market HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 数据目录，存放嵌入式数据库
    pub data_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 验签配置（令牌由外部身份服务签发）
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 支付网关 URL
    pub gateway_url: String,
    /// 网关回调共享密钥
    pub gateway_webhook_secret: String,
    /// 库存服务 URL
    pub inventory_url: String,
    /// 支付会话有效期（秒）
    pub session_ttl_secs: i64,
    /// 推送通道保活间隔（秒）
    pub ping_interval_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/var/lib/market".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::from_env(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            gateway_url: std::env::var("GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:4100".into()),
            gateway_webhook_secret: std::env::var("GATEWAY_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "dev-webhook-secret".into()),
            inventory_url: std::env::var("INVENTORY_URL")
                .unwrap_or_else(|_| "http://localhost:4200".into()),
            session_ttl_secs: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(shared::models::payment_session::SESSION_EXPIRE_IN_SECS),
            ping_interval_secs: std::env::var("PING_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
        }
    }

    /// 测试配置：固定密钥，默认端口
    pub fn for_tests() -> Self {
        Self {
            data_dir: String::new(),
            http_port: 0,
            jwt: JwtConfig::for_tests(),
            environment: "test".into(),
            gateway_url: "http://gateway.invalid".into(),
            gateway_webhook_secret: "test-webhook-secret".into(),
            inventory_url: "http://inventory.invalid".into(),
            session_ttl_secs: shared::models::payment_session::SESSION_EXPIRE_IN_SECS,
            ping_interval_secs: 30,
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
