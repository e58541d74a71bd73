use async_trait::async_trait;

use crate::domain::business::{Business, SearchQuery};
use crate::domain::message::IncomingMessage;
use crate::domain::reply::{Reply, UserProfile};
use crate::errors::{ConnectorError, SearchError};

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    /// Reply in the conversation the message came from.
    async fn reply(&self, message: &IncomingMessage, reply: Reply) -> Result<(), ConnectorError>;

    /// Reply visibly to the whole channel (used for outgoing webhooks).
    async fn reply_public(
        &self,
        message: &IncomingMessage,
        reply: Reply,
    ) -> Result<(), ConnectorError>;

    async fn lookup_user(&self, user_id: &str) -> Result<UserProfile, ConnectorError>;
}

/// Third-party business search. Results come back in provider order.
#[async_trait]
pub trait BusinessSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Business>, SearchError>;
}
