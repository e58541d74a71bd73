use std::collections::HashMap;
use std::future::Future;
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use chowbot_core::domain::message::ConversationKey;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::api::SlackApiClient;
use crate::events::{
    default_dispatcher, parse_socket_frame, DispatchError, EventContext, EventDispatcher,
    SlackEnvelope, SocketFrame,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// `Ok(None)` from `next_envelope` means the peer closed cleanly and the runner should stop.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

type SlackSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket Mode over a real WebSocket. Each `connect` asks Slack for a fresh URL.
pub struct WebSocketTransport {
    api: Arc<SlackApiClient>,
    sink: Mutex<Option<SplitSink<SlackSocket, WsMessage>>>,
    stream: Mutex<Option<SplitStream<SlackSocket>>>,
}

impl WebSocketTransport {
    pub fn new(api: Arc<SlackApiClient>) -> Self {
        Self { api, sink: Mutex::new(None), stream: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .api
            .open_socket_url()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (sink, stream) = socket.split();

        *self.sink.lock().await = Some(sink);
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Receive("socket is not connected".to_owned()));
        };

        loop {
            let Some(message) = stream.next().await else {
                return Err(TransportError::Receive("socket stream ended".to_owned()));
            };
            let raw = match message.map_err(|error| TransportError::Receive(error.to_string()))? {
                WsMessage::Text(text) => text,
                WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(error = %error, "dropping non-utf8 socket frame");
                        continue;
                    }
                },
                WsMessage::Close(frame) => {
                    return Err(TransportError::Receive(format!("socket closed: {frame:?}")));
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            match parse_socket_frame(&raw) {
                Ok(SocketFrame::Envelope(envelope)) => return Ok(Some(envelope)),
                Ok(SocketFrame::Hello) => {
                    debug!(event_name = "ingress.slack.hello", "socket mode session ready");
                }
                Ok(SocketFrame::Disconnect { reason }) => {
                    return Err(TransportError::Receive(format!(
                        "slack requested disconnect: {reason}"
                    )));
                }
                Ok(SocketFrame::Other { frame_type }) => {
                    debug!(frame_type = %frame_type, "skipping socket frame");
                }
                Err(error) => {
                    warn!(error = %error, "dropping undecodable socket frame");
                }
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(TransportError::Acknowledge("socket is not connected".to_owned()));
        };
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        sink.send(WsMessage::Text(ack))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.stream.lock().await.take();
        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        sink.close().await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl Default for SocketModeRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: Arc::new(default_dispatcher()),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: Arc<EventDispatcher>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Pumps envelopes until the transport closes, retries run out, or `shutdown` resolves.
    /// In-flight handlers are always drained before returning.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        let mut lanes = ConversationLanes::default();

        let interrupted = tokio::select! {
            () = self.reconnect_loop(&mut tasks, &mut lanes) => false,
            () = shutdown => true,
        };

        if interrupted {
            info!(event_name = "ingress.slack.shutdown", "closing socket mode transport");
            if let Err(error) = self.transport.disconnect().await {
                warn!(error = %error, "socket mode transport did not close cleanly");
            }
        }

        let pending = tasks.len();
        if pending > 0 {
            info!(pending, "waiting for in-flight slack handlers");
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(error) = joined {
                warn!(error = %error, "slack handler task aborted");
            }
        }

        Ok(())
    }

    async fn reconnect_loop(&self, tasks: &mut JoinSet<()>, lanes: &mut ConversationLanes) {
        let mut attempt = 0_u32;
        loop {
            let mut connected = false;
            let Err(transport_error) =
                self.connect_and_pump(attempt, tasks, lanes, &mut connected).await
            else {
                return;
            };

            // A session that got as far as connecting earns a fresh retry budget.
            if connected {
                attempt = 0;
            }

            warn!(
                attempt,
                max_retries = self.reconnect_policy.max_retries,
                error = %transport_error,
                "socket mode transport failed"
            );

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "socket mode retries exhausted; continuing process without crash"
                );
                return;
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        tasks: &mut JoinSet<()>,
        lanes: &mut ConversationLanes,
        connected: &mut bool,
    ) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        *connected = true;
        info!(attempt, "socket mode transport connected");

        loop {
            while let Some(joined) = tasks.try_join_next() {
                if let Err(error) = joined {
                    warn!(error = %error, "slack handler task aborted");
                }
            }

            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let channel_id = envelope.event.channel_id().unwrap_or("unknown").to_owned();

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                channel_id = %channel_id,
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    channel_id = %channel_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    channel_id = %channel_id,
                    "acknowledged slack envelope"
                );
            }

            let (previous, done) = lanes.enqueue(envelope.event.conversation_key());
            let dispatcher = Arc::clone(&self.dispatcher);
            tasks.spawn(async move {
                if let Some(previous) = previous {
                    // Resolves once the earlier envelope's task finishes, even if it panicked.
                    let _ = previous.await;
                }
                let context = EventContext { correlation_id: envelope.envelope_id.clone() };
                if let Err(error) = dispatcher.dispatch(&envelope, &context).await {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        channel_id = %channel_id,
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
                let _ = done.send(());
            });
        }
    }
}

/// Orders dispatch per conversation.
///
/// Every envelope with a key waits for the previous envelope with the same key, so one
/// user's messages reach the runtime in arrival order. Different keys never wait on each
/// other.
#[derive(Debug, Default)]
struct ConversationLanes {
    tails: HashMap<ConversationKey, oneshot::Receiver<()>>,
}

impl ConversationLanes {
    /// Returns the signal to await before dispatching, and the sender to fire when done.
    fn enqueue(
        &mut self,
        key: Option<ConversationKey>,
    ) -> (Option<oneshot::Receiver<()>>, oneshot::Sender<()>) {
        self.tails.retain(|_, tail| matches!(tail.try_recv(), Err(TryRecvError::Empty)));

        let (done, tail) = oneshot::channel();
        let previous = key.and_then(|key| self.tails.insert(key, tail));
        (previous, done)
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.tails.len()
    }
}
