use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chowbot_core::domain::business::{Business, SearchQuery};
use chowbot_core::domain::message::IncomingMessage;
use chowbot_core::domain::reply::{Reply, UserProfile};
use chowbot_core::errors::{ConnectorError, SearchError};
use chowbot_core::ports::{BusinessSearch, ChatConnector};
use chowbot_slack::events::{
    EventContext, EventHandlerError, MessageEvent, MessageService, SlackEnvelope, SlackEvent,
};
use chowbot_slack::socket::{SocketTransport, TransportError};

#[derive(Default)]
pub struct RecordingConnector {
    replies: Mutex<Vec<(IncomingMessage, Reply, bool)>>,
}

impl RecordingConnector {
    pub fn texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .map(|replies| {
                replies.iter().filter_map(|(_, reply, _)| reply.as_text().map(str::to_owned)).collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatConnector for RecordingConnector {
    async fn reply(&self, message: &IncomingMessage, reply: Reply) -> Result<(), ConnectorError> {
        self.replies.lock().expect("lock").push((message.clone(), reply, false));
        Ok(())
    }

    async fn reply_public(
        &self,
        message: &IncomingMessage,
        reply: Reply,
    ) -> Result<(), ConnectorError> {
        self.replies.lock().expect("lock").push((message.clone(), reply, true));
        Ok(())
    }

    async fn lookup_user(&self, user_id: &str) -> Result<UserProfile, ConnectorError> {
        Ok(UserProfile { id: user_id.to_owned(), name: "ada".to_owned() })
    }
}

pub struct FailingConnector;

#[async_trait]
impl ChatConnector for FailingConnector {
    async fn reply(&self, _message: &IncomingMessage, _reply: Reply) -> Result<(), ConnectorError> {
        Err(ConnectorError::Api {
            method: "chat.postMessage".to_owned(),
            message: "channel_not_found".to_owned(),
        })
    }

    async fn reply_public(
        &self,
        message: &IncomingMessage,
        reply: Reply,
    ) -> Result<(), ConnectorError> {
        self.reply(message, reply).await
    }

    async fn lookup_user(&self, _user_id: &str) -> Result<UserProfile, ConnectorError> {
        Err(ConnectorError::Transport("offline".to_owned()))
    }
}

#[derive(Default)]
pub struct FixedSearch {
    pub businesses: Vec<Business>,
}

#[async_trait]
impl BusinessSearch for FixedSearch {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<Business>, SearchError> {
        Ok(self.businesses.clone())
    }
}

#[derive(Default)]
pub struct RecordingService {
    messages: Mutex<Vec<IncomingMessage>>,
}

impl RecordingService {
    pub fn messages(&self) -> Vec<IncomingMessage> {
        self.messages.lock().map(|messages| messages.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageService for RecordingService {
    async fn handle_message(
        &self,
        message: &IncomingMessage,
        _ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        self.messages.lock().expect("lock").push(message.clone());
        Ok(())
    }
}

/// Delivers its envelopes once, then reports the stream closed.
pub struct ScriptedTransport {
    envelopes: Mutex<VecDeque<SlackEnvelope>>,
}

impl ScriptedTransport {
    pub fn new(envelopes: Vec<SlackEnvelope>) -> Self {
        Self { envelopes: Mutex::new(envelopes.into()) }
    }
}

#[async_trait]
impl SocketTransport for ScriptedTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(self.envelopes.lock().expect("lock").pop_front())
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub fn direct_message(envelope_id: &str, user_id: &str, text: &str) -> SlackEnvelope {
    SlackEnvelope {
        envelope_id: envelope_id.to_owned(),
        event: SlackEvent::Message(MessageEvent {
            channel_id: format!("D-{user_id}"),
            channel_type: Some("im".to_owned()),
            user_id: user_id.to_owned(),
            text: text.to_owned(),
            ts: "1730000000.0001".to_owned(),
            bot_id: None,
            subtype: None,
        }),
    }
}
