//! WebSocket implementation of [`PushTransport`].

use async_trait::async_trait;
use futures::StreamExt as _;
use tokio_tungstenite::tungstenite::Message;

use crate::channel::{ChannelError, MessageStream, PushTransport};

/// Receive-only WebSocket client. Outgoing frames are never sent; pings
/// are answered by the protocol layer.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn connect(&self) -> Result<MessageStream, ChannelError> {
        let (socket, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connect {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        log::debug!(
            "websocket handshake with {}: {}",
            self.url,
            response.status()
        );

        let messages = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => {
                    Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(Message::Close(frame)) => {
                    log::debug!("websocket close frame: {frame:?}");
                    None
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
                Err(e) => Some(Err(ChannelError::Transport {
                    message: e.to_string(),
                })),
            }
        });

        Ok(messages.boxed())
    }
}
