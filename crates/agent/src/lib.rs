//! Agent Runtime - routing and dialogue orchestration
//!
//! This crate sits between the chat connector and the core dialogue engine:
//! - **Intent Router** (`router`) - classify a message into an `Action` by phrase and scope
//! - **Session Store** (`sessions`) - one active dialogue per channel and user, with idle expiry
//! - **Bot Runtime** (`runtime`) - performs the side effects of an action through the
//!   injected `ChatConnector` and `BusinessSearch`
//!
//! # Flow
//!
//! 1. A message for a conversation with an open dialogue is fed to that dialogue.
//! 2. Otherwise the router picks an action in fixed registration order.
//! 3. The food action opens a fresh session; its prompts go out through the connector.
//! 4. The final dialogue step runs one timeout-bounded search and replies with up to five
//!    recommendations.

pub mod router;
pub mod runtime;
pub mod sessions;

pub use router::{Action, IntentRouter};
pub use runtime::{BotRuntime, HandleOutcome, RuntimeSettings};
pub use sessions::SessionStore;
