//! Chowbot Slack - Socket Mode and Web API plumbing
//!
//! This crate connects the bot runtime to a Slack workspace:
//! - **Socket Mode** (`socket`) - WebSocket event loop with reconnection and envelope acks
//! - **Web API** (`api`) - `auth.test`, `chat.postMessage`, `users.info`, `response_url` posts
//! - **Events** (`events`) - envelope decoding, message scoping, handler dispatch
//! - **Messages** (`blocks`) - text and recommendation attachment payloads
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to `message.*` and `app_mention` events
//! 3. Set env vars: `CHOWBOT_SLACK_APP_TOKEN`, `CHOWBOT_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Events → SocketModeRunner → EventDispatcher → MessageService → BotRuntime
//!                                                                         ↓
//!                                         SlackApiClient (ChatConnector) ← Reply
//! ```

pub mod api;
pub mod blocks;
pub mod events;
pub mod socket;

pub use api::SlackApiClient;
pub use events::{chat_dispatcher, EventDispatcher, MessageService, OutgoingWebhookPayload};
pub use socket::{ReconnectPolicy, SocketModeRunner, WebSocketTransport};
