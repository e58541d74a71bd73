use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chowbot_core::domain::message::{ConversationKey, IncomingMessage, MessageScope};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    AppMention(MessageEvent),
    OutgoingWebhook(OutgoingWebhookPayload),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::OutgoingWebhook(_) => SlackEventType::OutgoingWebhook,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Message(event) | Self::AppMention(event) => Some(&event.channel_id),
            Self::OutgoingWebhook(payload) => Some(&payload.channel_id),
            Self::Unsupported { .. } => None,
        }
    }

    /// Channel and sender of the event. Envelopes sharing a key are handled in arrival order.
    pub fn conversation_key(&self) -> Option<ConversationKey> {
        let (channel_id, user_id) = match self {
            Self::Message(event) | Self::AppMention(event) => (&event.channel_id, &event.user_id),
            Self::OutgoingWebhook(payload) => (&payload.channel_id, &payload.user_id),
            Self::Unsupported { .. } => return None,
        };
        Some(ConversationKey { channel_id: channel_id.clone(), user_id: user_id.clone() })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    AppMention,
    OutgoingWebhook,
    Unsupported,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub channel_type: Option<String>,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub bot_id: Option<String>,
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// Bot posts, edits, joins and other subtyped messages never reach the router.
    pub fn is_user_message(&self) -> bool {
        self.bot_id.is_none() && self.subtype.is_none() && !self.user_id.trim().is_empty()
    }
}

/// Fields Slack posts for a legacy outgoing webhook.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OutgoingWebhookPayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub trigger_word: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Converts a Slack event into the connector-independent message the runtime consumes.
///
/// Returns `None` for traffic the bot must not answer: its own posts, edits, and channel
/// messages that mention it (those arrive again as `app_mention`).
pub fn to_incoming_message(
    event: &SlackEvent,
    bot_user_id: Option<&str>,
) -> Option<IncomingMessage> {
    match event {
        SlackEvent::Message(event) => {
            if !event.is_user_message() || Some(event.user_id.as_str()) == bot_user_id {
                return None;
            }

            let scope = if event.channel_type.as_deref() == Some("im") {
                MessageScope::DirectMessage
            } else if bot_user_id.is_some_and(|bot| mentions(&event.text, bot)) {
                return None;
            } else {
                MessageScope::Ambient
            };

            Some(
                IncomingMessage::new(scope, &event.channel_id, &event.user_id, &event.text)
                    .with_ts(&event.ts),
            )
        }
        SlackEvent::AppMention(event) => {
            if !event.is_user_message() || Some(event.user_id.as_str()) == bot_user_id {
                return None;
            }

            let stripped = bot_user_id.and_then(|bot| strip_leading_mention(&event.text, bot));
            let (scope, text) = match stripped {
                Some(rest) => (MessageScope::DirectMention, rest.to_owned()),
                None => (MessageScope::Mention, event.text.clone()),
            };

            Some(
                IncomingMessage::new(scope, &event.channel_id, &event.user_id, text)
                    .with_ts(&event.ts),
            )
        }
        SlackEvent::OutgoingWebhook(payload) => {
            let mut message = IncomingMessage::new(
                MessageScope::OutgoingWebhook,
                &payload.channel_id,
                &payload.user_id,
                &payload.text,
            );
            if let Some(ts) = &payload.timestamp {
                message = message.with_ts(ts);
            }
            if let Some(response_url) = &payload.response_url {
                message = message.with_response_url(response_url);
            }
            Some(message)
        }
        SlackEvent::Unsupported { .. } => None,
    }
}

fn mentions(text: &str, bot_user_id: &str) -> bool {
    text.contains(&format!("<@{bot_user_id}>"))
}

fn strip_leading_mention<'a>(text: &'a str, bot_user_id: &str) -> Option<&'a str> {
    let rest = text.trim_start().strip_prefix(&format!("<@{bot_user_id}>"))?;
    Some(rest.trim_start_matches(|ch: char| ch == ':' || ch.is_whitespace()))
}

/// One decoded Socket Mode frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
    Other { frame_type: String },
}

#[derive(Debug, Deserialize)]
struct RawSocketFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEventCallback {
    #[serde(rename = "type")]
    callback_type: String,
    event: RawEvent,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

pub fn parse_socket_frame(raw: &str) -> Result<SocketFrame, serde_json::Error> {
    let frame: RawSocketFrame = serde_json::from_str(raw)?;

    if frame.frame_type == "hello" {
        return Ok(SocketFrame::Hello);
    }
    if frame.frame_type == "disconnect" {
        let reason = frame.reason.unwrap_or_else(|| "unspecified".to_owned());
        return Ok(SocketFrame::Disconnect { reason });
    }

    let Some(envelope_id) = frame.envelope_id else {
        return Ok(SocketFrame::Other { frame_type: frame.frame_type });
    };

    let event = match (frame.frame_type.as_str(), frame.payload) {
        ("events_api", Some(payload)) => decode_event_callback(payload)?,
        _ => SlackEvent::Unsupported { event_type: frame.frame_type.clone() },
    };

    Ok(SocketFrame::Envelope(SlackEnvelope { envelope_id, event }))
}

fn decode_event_callback(payload: Value) -> Result<SlackEvent, serde_json::Error> {
    let callback: RawEventCallback = serde_json::from_value(payload)?;
    if callback.callback_type != "event_callback" {
        return Ok(SlackEvent::Unsupported { event_type: callback.callback_type });
    }

    let raw = callback.event;
    let message = || MessageEvent {
        channel_id: raw.channel.clone().unwrap_or_default(),
        channel_type: raw.channel_type.clone(),
        user_id: raw.user.clone().unwrap_or_default(),
        text: raw.text.clone().unwrap_or_default(),
        ts: raw.ts.clone().unwrap_or_default(),
        bot_id: raw.bot_id.clone(),
        subtype: raw.subtype.clone(),
    };

    Ok(match raw.event_type.as_str() {
        "message" => SlackEvent::Message(message()),
        "app_mention" => SlackEvent::AppMention(message()),
        other => SlackEvent::Unsupported { event_type: other.to_owned() },
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("message handler failure: {0}")]
    Message(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Receives every message the bot is allowed to act on.
#[async_trait]
pub trait MessageService: Send + Sync {
    async fn handle_message(
        &self,
        message: &IncomingMessage,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

#[derive(Default)]
pub struct NoopMessageService;

#[async_trait]
impl MessageService for NoopMessageService {
    async fn handle_message(
        &self,
        message: &IncomingMessage,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        tracing::debug!(
            event_name = "slack.message.noop",
            correlation_id = %ctx.correlation_id,
            scope = message.scope.as_str(),
            "no message service configured"
        );
        Ok(())
    }
}

pub struct ChatMessageHandler<S> {
    event_type: SlackEventType,
    service: Arc<S>,
    bot_user_id: Option<String>,
}

impl<S> ChatMessageHandler<S>
where
    S: MessageService,
{
    pub fn new(event_type: SlackEventType, service: Arc<S>, bot_user_id: Option<String>) -> Self {
        Self { event_type, service, bot_user_id }
    }
}

#[async_trait]
impl<S> EventHandler for ChatMessageHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        self.event_type
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let Some(message) = to_incoming_message(&envelope.event, self.bot_user_id.as_deref())
        else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_message(&message, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

/// Dispatcher with one chat handler per message-bearing event type.
pub fn chat_dispatcher<S>(service: Arc<S>, bot_user_id: Option<String>) -> EventDispatcher
where
    S: MessageService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    for event_type in
        [SlackEventType::Message, SlackEventType::AppMention, SlackEventType::OutgoingWebhook]
    {
        dispatcher.register(ChatMessageHandler::new(
            event_type,
            service.clone(),
            bot_user_id.clone(),
        ));
    }
    dispatcher
}

pub fn default_dispatcher() -> EventDispatcher {
    chat_dispatcher(Arc::new(NoopMessageService), None)
}
