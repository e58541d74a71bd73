use std::time::Duration;

use async_trait::async_trait;
use chowbot_core::config::SlackConfig;
use chowbot_core::domain::message::IncomingMessage;
use chowbot_core::domain::reply::{Reply, UserProfile};
use chowbot_core::errors::ConnectorError;
use chowbot_core::ports::ChatConnector;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::blocks::MessagePayload;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    ok: bool,
    user: Option<SlackUser>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
    name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Slack Web API client. Bot-token calls answer users; the app token only opens sockets.
#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: SecretString,
    bot_token: SecretString,
}

impl SlackApiClient {
    pub fn new(
        api_base: impl Into<String>,
        app_token: SecretString,
        bot_token: SecretString,
    ) -> Result<Self, ConnectorError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chowbot/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ConnectorError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            app_token,
            bot_token,
        })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, ConnectorError> {
        Self::new(&config.api_base_url, config.app_token.clone(), config.bot_token.clone())
    }

    /// Resolves the bot's own user id, which mention detection depends on.
    pub async fn auth_test(&self) -> Result<String, ConnectorError> {
        let method = "auth.test";
        let response: AuthTestResponse = self
            .request_json(
                method,
                self.http
                    .post(self.url(method))
                    .bearer_auth(self.bot_token.expose_secret()),
            )
            .await?;

        if !response.ok {
            return Err(api_error(method, response.error));
        }
        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConnectorError::Decode(format!("{method} did not return user_id")))
    }

    pub async fn open_socket_url(&self) -> Result<String, ConnectorError> {
        let method = "apps.connections.open";
        let response: OpenSocketResponse = self
            .request_json(
                method,
                self.http
                    .post(self.url(method))
                    .bearer_auth(self.app_token.expose_secret()),
            )
            .await?;

        if !response.ok {
            return Err(api_error(method, response.error));
        }
        response
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConnectorError::Decode(format!("{method} did not return url")))
    }

    pub async fn post_message(
        &self,
        channel: &str,
        payload: MessagePayload,
    ) -> Result<PostedMessage, ConnectorError> {
        let method = "chat.postMessage";
        let payload = payload.channel(channel);
        let response: PostMessageResponse = self
            .request_json(
                method,
                self.http
                    .post(self.url(method))
                    .bearer_auth(self.bot_token.expose_secret())
                    .json(&payload),
            )
            .await?;

        if !response.ok {
            return Err(api_error(method, response.error));
        }

        Ok(PostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_owned()),
            ts: response
                .ts
                .ok_or_else(|| ConnectorError::Decode(format!("{method} response missing ts")))?,
        })
    }

    /// Posts to a webhook `response_url`. Slack answers these with a plain `ok` body.
    pub async fn post_response_url(
        &self,
        response_url: &str,
        payload: MessagePayload,
    ) -> Result<(), ConnectorError> {
        let method = "response_url";
        let response = self
            .http
            .post(response_url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| ConnectorError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Api {
                method: method.to_owned(),
                message: format!("status {}: {body}", status.as_u16()),
            });
        }
        Ok(())
    }

    pub async fn user_info(&self, user_id: &str) -> Result<UserProfile, ConnectorError> {
        let method = "users.info";
        let response: UserInfoResponse = self
            .request_json(
                method,
                self.http
                    .get(self.url(method))
                    .query(&[("user", user_id)])
                    .bearer_auth(self.bot_token.expose_secret()),
            )
            .await?;

        if !response.ok {
            return Err(api_error(method, response.error));
        }
        let user = response
            .user
            .ok_or_else(|| ConnectorError::Decode(format!("{method} response missing user")))?;
        Ok(UserProfile { id: user.id, name: user.name })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    async fn request_json<T>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ConnectorError>
    where
        T: DeserializeOwned,
    {
        let response =
            request.send().await.map_err(|error| ConnectorError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Api {
                method: method.to_owned(),
                message: format!("status {}: {body}", status.as_u16()),
            });
        }

        response.json::<T>().await.map_err(|error| ConnectorError::Decode(error.to_string()))
    }
}

fn api_error(method: &str, error: Option<String>) -> ConnectorError {
    ConnectorError::Api {
        method: method.to_owned(),
        message: error.unwrap_or_else(|| "unknown error".to_owned()),
    }
}

#[async_trait]
impl ChatConnector for SlackApiClient {
    async fn reply(&self, message: &IncomingMessage, reply: Reply) -> Result<(), ConnectorError> {
        let posted =
            self.post_message(&message.channel_id, MessagePayload::from_reply(&reply)).await?;
        debug!(
            event_name = "egress.slack.reply_sent",
            channel_id = %posted.channel,
            ts = %posted.ts,
            "posted slack reply"
        );
        Ok(())
    }

    async fn reply_public(
        &self,
        message: &IncomingMessage,
        reply: Reply,
    ) -> Result<(), ConnectorError> {
        let payload = MessagePayload::from_reply(&reply).in_channel();
        match message.response_url.as_deref() {
            Some(response_url) => self.post_response_url(response_url, payload).await,
            None => self.post_message(&message.channel_id, payload).await.map(|_| ()),
        }
    }

    async fn lookup_user(&self, user_id: &str) -> Result<UserProfile, ConnectorError> {
        self.user_info(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use chowbot_core::domain::business::Business;
    use chowbot_core::domain::message::{IncomingMessage, MessageScope};
    use chowbot_core::domain::reply::Reply;
    use chowbot_core::errors::ConnectorError;
    use chowbot_core::ports::ChatConnector;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::SlackApiClient;

    fn client(server: &MockServer) -> SlackApiClient {
        SlackApiClient::new(
            server.base_url(),
            "xapp-test".to_owned().into(),
            "xoxb-test".to_owned().into(),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn auth_test_returns_bot_user_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/auth.test").header("authorization", "Bearer xoxb-test");
            then.status(200).json_body(json!({ "ok": true, "user_id": "UBOT" }));
        });

        let user_id = client(&server).auth_test().await.expect("auth.test succeeds");

        assert_eq!(user_id, "UBOT");
        mock.assert();
    }

    #[tokio::test]
    async fn open_socket_uses_the_app_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/apps.connections.open")
                .header("authorization", "Bearer xapp-test");
            then.status(200).json_body(json!({ "ok": true, "url": "wss://socket.test/link" }));
        });

        let url = client(&server).open_socket_url().await.expect("socket url");

        assert_eq!(url, "wss://socket.test/link");
        mock.assert();
    }

    #[tokio::test]
    async fn slack_level_errors_surface_as_api_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth.test");
            then.status(200).json_body(json!({ "ok": false, "error": "invalid_auth" }));
        });

        let error = client(&server).auth_test().await.expect_err("auth should fail");

        assert_eq!(
            error,
            ConnectorError::Api {
                method: "auth.test".to_owned(),
                message: "invalid_auth".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn recommendation_reply_posts_an_attachment_to_the_channel() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("authorization", "Bearer xoxb-test")
                .json_body_partial(
                    json!({
                        "channel": "C1",
                        "attachments": [{
                            "fallback": "Here is a restaurant suggestion!",
                            "title": "Taqueria",
                            "color": "#7CD197"
                        }]
                    })
                    .to_string(),
                );
            then.status(200).json_body(json!({ "ok": true, "channel": "C1", "ts": "1.2" }));
        });

        let message = IncomingMessage::new(MessageScope::Mention, "C1", "U1", "Austin");
        let reply = Reply::recommendation(Business {
            name: "Taqueria".to_owned(),
            url: "https://www.yelp.com/biz/taqueria".to_owned(),
            rating: 4.0,
            review_count: 12,
            image_url: String::new(),
        });

        client(&server).reply(&message, reply).await.expect("reply posts");
        mock.assert();
    }

    #[tokio::test]
    async fn public_reply_prefers_the_response_url() {
        let server = MockServer::start();
        let hook = server.mock(|when, then| {
            when.method(POST)
                .path("/hooks/response")
                .json_body(json!({ "text": "hey! here", "response_type": "in_channel" }));
            then.status(200).body("ok");
        });
        let post = server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage");
            then.status(200).json_body(json!({ "ok": true, "channel": "C1", "ts": "1.3" }));
        });

        let message = IncomingMessage::new(MessageScope::OutgoingWebhook, "C1", "U1", "bot?")
            .with_response_url(server.url("/hooks/response"));

        client(&server).reply_public(&message, Reply::text("hey! here")).await.expect("reply");

        hook.assert();
        assert_eq!(post.hits(), 0);
    }

    #[tokio::test]
    async fn public_reply_without_response_url_posts_to_the_channel() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .json_body_partial(json!({ "channel": "C7", "text": "hey! here" }).to_string());
            then.status(200).json_body(json!({ "ok": true, "channel": "C7", "ts": "1.4" }));
        });

        let message = IncomingMessage::new(MessageScope::OutgoingWebhook, "C7", "U1", "bot?");
        client(&server).reply_public(&message, Reply::text("hey! here")).await.expect("reply");

        post.assert();
    }

    #[tokio::test]
    async fn lookup_user_reads_the_user_name() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users.info").query_param("user", "U1");
            then.status(200).json_body(json!({
                "ok": true,
                "user": { "id": "U1", "name": "ada", "real_name": "Ada Lovelace" }
            }));
        });

        let profile = client(&server).lookup_user("U1").await.expect("lookup");

        assert_eq!(profile.name, "ada");
        assert_eq!(profile.id, "U1");
    }

    #[tokio::test]
    async fn http_failures_carry_the_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users.info");
            then.status(503).body("unavailable");
        });

        let error = client(&server).lookup_user("U1").await.expect_err("lookup fails");

        assert!(matches!(
            error,
            ConnectorError::Api { ref method, ref message }
                if method == "users.info" && message.starts_with("status 503")
        ));
    }
}
