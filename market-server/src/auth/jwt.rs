//! JWT 令牌验证
//!
//! 令牌由外部身份服务签发（HS256 共享密钥），本服务只做验签与解析，
//! 不签发、不续期。

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 共享验签密钥 (应至少 32 字节)
    pub secret: String,
    /// 令牌签发者
    pub issuer: String,
    /// 令牌受众
    pub audience: String,
}

impl JwtConfig {
    /// 从环境变量加载
    ///
    /// # Panics
    ///
    /// 生产构建下缺失 `JWT_SECRET` 时 panic；开发构建回退到固定密钥。
    pub fn from_env() -> Self {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) => {
                #[cfg(debug_assertions)]
                {
                    tracing::warn!("JWT_SECRET not set, using development key");
                    "development-only-secret-must-be-replaced".to_string()
                }
                #[cfg(not(debug_assertions))]
                {
                    panic!("FATAL: JWT_SECRET must be configured in production");
                }
            }
        };

        Self {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "identity-service".to_string()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "market".to_string()),
        }
    }

    /// 测试配置
    pub fn for_tests() -> Self {
        Self {
            secret: "test-secret-0123456789-0123456789".to_string(),
            issuer: "identity-service".to_string(),
            audience: "market".to_string(),
        }
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID (Subject)
    pub sub: String,
    /// 角色: buyer | seller | admin
    pub role: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
    /// 受众
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,
}

/// JWT 验证服务
#[derive(Debug)]
pub struct JwtService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// 验证令牌并返回 Claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                other => JwtError::InvalidToken(format!("{:?}", other)),
            })
    }

    /// 从 `Authorization: Bearer <token>` 头中提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use shared::util::now_millis;

    fn issue(config: &JwtConfig, sub: &str, role: &str, ttl_secs: i64) -> String {
        let now = now_millis() / 1000;
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: now + ttl_secs,
            iat: now,
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_validate_accepts_valid_token() {
        let config = JwtConfig::for_tests();
        let service = JwtService::new(&config);
        let token = issue(&config, "u-1", "buyer", 3600);

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, "buyer");
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        let config = JwtConfig::for_tests();
        let service = JwtService::new(&config);
        let token = issue(&config, "u-1", "buyer", -3600);

        match service.validate_token(&token) {
            Err(JwtError::ExpiredToken) => {}
            other => panic!("Expected ExpiredToken, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_wrong_secret() {
        let config = JwtConfig::for_tests();
        let mut other_config = JwtConfig::for_tests();
        other_config.secret = "another-secret-another-secret-xx".to_string();
        let service = JwtService::new(&config);
        let token = issue(&other_config, "u-1", "buyer", 3600);

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
