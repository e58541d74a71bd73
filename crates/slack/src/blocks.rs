use chowbot_core::domain::business::Business;
use chowbot_core::domain::reply::Reply;
use serde::Serialize;

pub const RECOMMENDATION_FALLBACK: &str = "Here is a restaurant suggestion!";
pub const RECOMMENDATION_COLOR: &str = "#7CD197";

/// Legacy message attachment; recommendations render as one card each.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    pub title: String,
    pub title_link: String,
    pub text: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Attachment {
    pub fn recommendation(business: &Business) -> Self {
        Self {
            fallback: RECOMMENDATION_FALLBACK.to_owned(),
            title: business.name.clone(),
            title_link: business.url.clone(),
            text: business.summary_text(),
            color: RECOMMENDATION_COLOR.to_owned(),
            image_url: Some(business.image_url.clone()).filter(|url| !url.is_empty()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

/// Body shared by `chat.postMessage` and `response_url` posts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self { channel: None, text: text.into(), attachments: Vec::new(), response_type: None }
    }

    pub fn recommendation(business: &Business) -> Self {
        Self {
            channel: None,
            text: String::new(),
            attachments: vec![Attachment::recommendation(business)],
            response_type: None,
        }
    }

    pub fn from_reply(reply: &Reply) -> Self {
        match reply {
            Reply::Text { text } => Self::text(text.clone()),
            Reply::Recommendation { business } => Self::recommendation(business),
        }
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn in_channel(mut self) -> Self {
        self.response_type = Some(ResponseType::InChannel);
        self
    }

    pub fn fallback_text(&self) -> &str {
        if self.text.is_empty() {
            self.attachments.first().map(|attachment| attachment.fallback.as_str()).unwrap_or("")
        } else {
            &self.text
        }
    }
}
