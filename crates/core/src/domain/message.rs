use serde::{Deserialize, Serialize};

/// Channel context a message arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageScope {
    DirectMessage,
    DirectMention,
    Mention,
    OutgoingWebhook,
    /// Channel chatter that does not address the bot. Only feeds active dialogues.
    Ambient,
}

impl MessageScope {
    /// Scopes the intent router answers in the conversational reply channel.
    pub fn is_conversational(&self) -> bool {
        matches!(self, Self::DirectMessage | Self::DirectMention | Self::Mention)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMessage => "direct_message",
            Self::DirectMention => "direct_mention",
            Self::Mention => "mention",
            Self::OutgoingWebhook => "outgoing_webhook",
            Self::Ambient => "ambient",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    pub scope: MessageScope,
    pub ts: String,
    pub response_url: Option<String>,
}

impl IncomingMessage {
    pub fn new(
        scope: MessageScope,
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            scope,
            ts: String::new(),
            response_url: None,
        }
    }

    pub fn with_ts(mut self, ts: impl Into<String>) -> Self {
        self.ts = ts.into();
        self
    }

    pub fn with_response_url(mut self, response_url: impl Into<String>) -> Self {
        self.response_url = Some(response_url.into());
        self
    }

    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey { channel_id: self.channel_id.clone(), user_id: self.user_id.clone() }
    }
}

/// Identifies the one dialogue a user can have open in a channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub channel_id: String,
    pub user_id: String,
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.user_id)
    }
}
