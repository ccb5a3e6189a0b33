//! HTTP client for network-based API calls

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::ApiResponse;
use shared::response::CODE_TOKEN_EXPIRED;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// HTTP client for making network requests to the market server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request without body
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    ///
    /// 错误响应同样携带 `{code, message}` 信封，按稳定错误码与
    /// HTTP 状态映射到 [`ClientError`]。
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<ApiResponse<()>>(&text) {
                if envelope.code == CODE_TOKEN_EXPIRED {
                    return Err(ClientError::TokenExpired);
                }
                return Err(match status {
                    StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
                    StatusCode::FORBIDDEN => ClientError::Forbidden(envelope.message),
                    StatusCode::NOT_FOUND => ClientError::NotFound(envelope.message),
                    StatusCode::BAD_REQUEST => ClientError::Validation(envelope.message),
                    StatusCode::CONFLICT => ClientError::Conflict(envelope.message),
                    StatusCode::UNPROCESSABLE_ENTITY => ClientError::BusinessRule(envelope.message),
                    StatusCode::BAD_GATEWAY => ClientError::Upstream(envelope.message),
                    _ => ClientError::Internal(envelope.message),
                });
            }
            return Err(ClientError::Internal(text));
        }

        serde_json::from_str(&text).map_err(Into::into)
    }
}
