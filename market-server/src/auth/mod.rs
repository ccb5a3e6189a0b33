//! 认证与授权
//!
//! 认证本身由外部身份服务完成：它签发携带 `(sub, role)` 的 JWT。
//! 本模块只负责把请求凭证解析为 `(actor_id, role)` 并交给业务层授权。

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};

use serde::Serialize;
use shared::models::Role;

/// 当前请求用户（由 [`extractor`] 从 JWT 解析）
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    /// 用户 ID
    pub actor_id: String,
    /// 角色
    pub role: Role,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role: Role = claims.role.parse()?;
        Ok(Self {
            actor_id: claims.sub,
            role,
        })
    }
}
