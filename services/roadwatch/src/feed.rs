//! Live feed client
//!
//! Consumes the one-directional camera feed socket: the server pushes JSON
//! messages carrying a base64 JPEG frame and a detection status tag, and the
//! client never sends anything. The connection lifecycle is an explicit
//! state machine: Connecting, Streaming once the socket opens, Reconnecting
//! with a fixed-interval backoff after a drop, and Closed once the retry cap
//! is exhausted or the client is shut down.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::FeedConfig;
use crate::state::{current_epoch_ms, StateHandle};

/// Connection state of the live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    Connecting,
    Streaming,
    Reconnecting { attempt: u32 },
    Closed,
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedState::Connecting => write!(f, "Connecting"),
            FeedState::Streaming => write!(f, "Streaming"),
            FeedState::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {})", attempt),
            FeedState::Closed => write!(f, "Closed"),
        }
    }
}

/// Trait for reading text messages from the feed socket
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait FeedSource: Send {
    /// Next text message from the feed
    ///
    /// Returns `Ok(Some(text))` for a received message, `Ok(None)` when the
    /// remote closed the connection, or an error if reading failed.
    async fn next_message(&mut self) -> crate::Result<Option<String>>;
}

/// Trait for opening feed connections, enabling mocking in tests
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, url: &str) -> crate::Result<Box<dyn FeedSource>>;
}

/// WebSocket implementation of FeedSource
pub struct WsFeedSource {
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
}

#[async_trait]
impl FeedSource for WsFeedSource {
    async fn next_message(&mut self) -> crate::Result<Option<String>> {
        use tokio_tungstenite::tungstenite::Message;

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(other)) => {
                    // ping/pong handled by the transport; nothing else carries frames
                    tracing::debug!("Ignoring non-text feed message: {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(crate::RoadwatchError::FeedConnection(e.to_string()));
                }
            }
        }
    }
}

/// WebSocket implementation of FeedConnector
#[derive(Default, Clone)]
pub struct WsFeedConnector;

#[async_trait]
impl FeedConnector for WsFeedConnector {
    async fn connect(&self, url: &str) -> crate::Result<Box<dyn FeedSource>> {
        tracing::debug!("Connecting to feed at {}", url);
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| crate::RoadwatchError::FeedConnection(e.to_string()))?;
        tracing::debug!("Feed connection established to {}", url);
        Ok(Box::new(WsFeedSource { stream }))
    }
}

/// Why a streaming session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Cancelled,
    Disconnected,
}

/// Client driving the feed state machine against shared display state
pub struct FeedClient {
    url: String,
    reconnect_interval: std::time::Duration,
    max_retries: Option<u32>,
    connector: Arc<dyn FeedConnector>,
}

impl FeedClient {
    pub fn new(config: &FeedConfig, connector: Arc<dyn FeedConnector>) -> Self {
        Self {
            url: config.url.clone(),
            reconnect_interval: std::time::Duration::from_secs(config.reconnect.interval_seconds),
            max_retries: config.reconnect.max_retries,
            connector,
        }
    }

    /// Run until the cancellation token fires or the retry cap is exhausted.
    /// The shared feed view always reflects the current machine state, so a
    /// dropped connection is visible rather than a silent frozen frame.
    pub async fn run(&self, state: StateHandle, cancel: CancellationToken) {
        let mut attempt = 0u32;

        loop {
            let conn_state = if attempt == 0 {
                FeedState::Connecting
            } else {
                FeedState::Reconnecting { attempt }
            };
            state.write().await.feed.conn = conn_state;

            if attempt > 0 {
                tracing::info!(
                    "Reconnecting to feed (attempt {}/{})",
                    attempt,
                    self.max_retries
                        .map_or("unlimited".to_string(), |m| m.to_string())
                );
                tokio::select! {
                    _ = tokio::time::sleep(self.reconnect_interval) => {}
                    _ = cancel.cancelled() => break,
                }
            }

            let source = tokio::select! {
                result = self.connector.connect(&self.url) => result,
                _ = cancel.cancelled() => break,
            };

            match source {
                Ok(source) => {
                    tracing::info!("Feed streaming from {}", self.url);
                    attempt = 0;
                    state.write().await.feed.conn = FeedState::Streaming;

                    match stream_messages(source, &state, &cancel).await {
                        StreamEnd::Cancelled => break,
                        StreamEnd::Disconnected => {
                            attempt = 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Feed connection attempt failed: {}", e);
                    attempt += 1;
                }
            }

            if let Some(max) = self.max_retries {
                if attempt > max {
                    tracing::warn!("Feed reconnection abandoned: max retries ({}) exceeded", max);
                    state.write().await.feed.conn = FeedState::Closed;
                    return;
                }
            }
        }

        tracing::debug!("Feed client cancelled");
        state.write().await.feed.conn = FeedState::Closed;
    }
}

/// Pump messages into the display slot until the stream ends. Each message
/// replaces the previous frame; there is no queue, so only the latest frame
/// is guaranteed visible.
async fn stream_messages(
    mut source: Box<dyn FeedSource>,
    state: &StateHandle,
    cancel: &CancellationToken,
) -> StreamEnd {
    loop {
        let message = tokio::select! {
            message = source.next_message() => message,
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
        };

        match message {
            Ok(Some(text)) => {
                state.write().await.feed.apply_message(&text, current_epoch_ms());
            }
            Ok(None) => {
                tracing::warn!("Feed connection closed by remote");
                return StreamEnd::Disconnected;
            }
            Err(e) => {
                tracing::warn!("Feed connection lost: {}", e);
                return StreamEnd::Disconnected;
            }
        }
    }
}
