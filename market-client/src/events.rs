//! 推送通道客户端
//!
//! 通道是缓存失效信号：断线后重连并重新拉取订单即可，
//! 不存在需要补投的事件。

use futures::StreamExt;
use shared::message::PushEvent;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 服务端推送事件流
pub struct EventStream {
    inner: WsStream,
}

impl EventStream {
    /// 建立 WebSocket 连接（令牌经查询参数传递）
    pub async fn connect(config: &ClientConfig, token: &str) -> ClientResult<Self> {
        let url = config.events_url(token);
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;
        tracing::debug!("Push channel connected");
        Ok(Self { inner: stream })
    }

    /// 下一条业务事件；保活 PING 自动跳过，`None` 表示连接已关闭
    pub async fn next_event(&mut self) -> ClientResult<Option<PushEvent>> {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let event = PushEvent::from_json(text.as_str())?;
                    if event.is_ping() {
                        continue;
                    }
                    return Ok(Some(event));
                }
                Ok(Message::Close(_)) => return Ok(None),
                Ok(_) => continue,
                Err(e) => return Err(ClientError::WebSocket(e.to_string())),
            }
        }
        Ok(None)
    }
}
