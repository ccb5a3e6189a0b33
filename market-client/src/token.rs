//! 凭证管理
//!
//! 令牌由外部身份服务签发，[`TokenSource`] 抽象获取渠道。
//! 刷新是单飞的：无论多少个请求同时撞上过期令牌，身份服务
//! 只会收到一次刷新调用，其余请求等待同一个 future 的结果。

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, RwLock};

use crate::error::{ClientError, ClientResult};

/// 令牌来源（身份服务客户端、密钥文件等）
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// 获取一枚新令牌
    async fn fetch_token(&self) -> Result<String, String>;
}

type SharedRefresh = Shared<BoxFuture<'static, Result<String, String>>>;

/// 单飞令牌管理器
pub struct TokenManager {
    source: Arc<dyn TokenSource>,
    token: RwLock<Option<String>>,
    /// 进行中的刷新；并发刷新共享同一个 future
    inflight: Mutex<Option<SharedRefresh>>,
}

impl TokenManager {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            token: RwLock::new(None),
            inflight: Mutex::new(None),
        }
    }

    /// 当前缓存的令牌
    pub async fn current(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// 刷新令牌（单飞）
    pub async fn refresh(&self) -> ClientResult<String> {
        let fut = {
            let mut inflight = self.inflight.lock().await;
            if let Some(fut) = inflight.as_ref() {
                fut.clone()
            } else {
                let source = self.source.clone();
                let fut: SharedRefresh =
                    async move { source.fetch_token().await }.boxed().shared();
                *inflight = Some(fut.clone());
                fut
            }
        };

        let result = fut.await;

        {
            let mut inflight = self.inflight.lock().await;
            *inflight = None;
        }

        match result {
            Ok(token) => {
                *self.token.write().await = Some(token.clone());
                Ok(token)
            }
            Err(e) => Err(ClientError::TokenRefresh(e)),
        }
    }

    /// 取当前令牌，没有则刷新
    pub async fn current_or_refresh(&self) -> ClientResult<String> {
        if let Some(token) = self.current().await {
            return Ok(token);
        }
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<String, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            // 拉开时间差，让并发刷新真正重叠
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(format!("token-{n}"))
        }
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let manager = Arc::new(TokenManager::new(source.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.refresh().await }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(tokens.iter().all(|t| t == "token-1"));
        assert_eq!(manager.current().await.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_sequential_refreshes_fetch_again() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let manager = TokenManager::new(source.clone());

        assert_eq!(manager.refresh().await.unwrap(), "token-1");
        assert_eq!(manager.refresh().await.unwrap(), "token-2");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    struct FailingSource;

    #[async_trait]
    impl TokenSource for FailingSource {
        async fn fetch_token(&self) -> Result<String, String> {
            Err("identity service unreachable".to_string())
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces_and_clears_inflight() {
        let manager = TokenManager::new(Arc::new(FailingSource));
        assert!(matches!(
            manager.refresh().await,
            Err(ClientError::TokenRefresh(_))
        ));
        // 失败不缓存，下一次 refresh 重新尝试
        assert!(manager.current().await.is_none());
        assert!(manager.refresh().await.is_err());
    }
}
