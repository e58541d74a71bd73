use std::sync::Arc;

use chowbot_agent::{BotRuntime, RuntimeSettings};
use chowbot_core::config::{AppConfig, ConfigError, LoadOptions};
use chowbot_core::errors::{ConnectorError, SearchError};
use chowbot_core::ports::{BusinessSearch, ChatConnector};
use chowbot_slack::api::SlackApiClient;
use chowbot_slack::events::{chat_dispatcher, EventDispatcher};
use chowbot_slack::socket::{
    ReconnectPolicy, SocketModeRunner, SocketTransport, WebSocketTransport,
};
use chowbot_yelp::YelpClient;
use thiserror::Error;
use tracing::info;

use crate::service::RuntimeMessageService;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<BotRuntime>,
    pub dispatcher: Arc<EventDispatcher>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client setup failed: {0}")]
    SlackClient(#[source] ConnectorError),
    #[error("slack auth.test failed: {0}")]
    SlackAuth(#[source] ConnectorError),
    #[error("yelp client setup failed: {0}")]
    YelpClient(#[source] SearchError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let slack =
        Arc::new(SlackApiClient::from_config(&config.slack).map_err(BootstrapError::SlackClient)?);
    let bot_user_id = slack.auth_test().await.map_err(BootstrapError::SlackAuth)?;
    info!(
        event_name = "system.bootstrap.slack_authenticated",
        correlation_id = "bootstrap",
        bot_user_id = %bot_user_id,
        "slack credentials verified"
    );

    let search =
        Arc::new(YelpClient::from_config(&config.yelp).map_err(BootstrapError::YelpClient)?);
    let transport = Arc::new(WebSocketTransport::new(slack.clone()));

    Ok(assemble(config, slack, search, transport, Some(bot_user_id)))
}

/// Wires already-built adapters into the runtime, dispatcher and socket runner.
pub fn assemble(
    config: AppConfig,
    connector: Arc<dyn ChatConnector>,
    search: Arc<dyn BusinessSearch>,
    transport: Arc<dyn SocketTransport>,
    bot_user_id: Option<String>,
) -> Application {
    let runtime =
        Arc::new(BotRuntime::new(connector, search, RuntimeSettings::from(&config.dialogue)));
    let service = Arc::new(RuntimeMessageService::new(runtime.clone()));
    let dispatcher = Arc::new(chat_dispatcher(service, bot_user_id));
    let slack_runner =
        SocketModeRunner::new(transport, dispatcher.clone(), ReconnectPolicy::default());

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        "application assembled"
    );

    Application { config, runtime, dispatcher, slack_runner }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chowbot_core::config::AppConfig;
    use chowbot_core::dialogue::{CONFIRMATION_PROMPT, FOOD_TYPE_PROMPT, LOCATION_PROMPT};
    use chowbot_slack::socket::NoopSocketTransport;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{assemble, bootstrap_with_config, BootstrapError};
    use crate::testing::{direct_message, FixedSearch, RecordingConnector, ScriptedTransport};

    fn valid_config(slack_base: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.slack.app_token = "xapp-test".to_owned().into();
        config.slack.bot_token = "xoxb-test".to_owned().into();
        config.slack.api_base_url = slack_base.to_owned();
        config.yelp.api_key = "yelp-key".to_owned().into();
        config
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_malformed_slack_token() {
        let mut config = valid_config("http://127.0.0.1:9");
        config.slack.app_token = "invalid-token".to_owned().into();

        let error = bootstrap_with_config(config).await.err().expect("bootstrap should fail");

        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("slack.app_token"));
    }

    #[tokio::test]
    async fn bootstrap_rejects_credentials_slack_refuses() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth.test");
            then.status(200).json_body(json!({ "ok": false, "error": "invalid_auth" }));
        });

        let error = bootstrap_with_config(valid_config(&server.base_url()))
            .await
            .err()
            .expect("bootstrap should fail");

        assert!(matches!(error, BootstrapError::SlackAuth(_)));
        assert!(error.to_string().contains("invalid_auth"));
    }

    #[tokio::test]
    async fn bootstrap_succeeds_once_slack_confirms_the_bot() {
        let server = MockServer::start();
        let auth = server.mock(|when, then| {
            when.method(POST).path("/auth.test").header("authorization", "Bearer xoxb-test");
            then.status(200).json_body(json!({ "ok": true, "user_id": "UBOT" }));
        });

        let app = bootstrap_with_config(valid_config(&server.base_url()))
            .await
            .expect("bootstrap should succeed");

        auth.assert();
        assert_eq!(app.dispatcher.handler_count(), 3);
        assert_eq!(app.runtime.sessions().active_count().await, 0);
    }

    #[tokio::test]
    async fn assembled_application_shares_one_runtime() {
        let app = assemble(
            valid_config("http://127.0.0.1:9"),
            Arc::new(RecordingConnector::default()),
            Arc::new(FixedSearch::default()),
            Arc::new(NoopSocketTransport),
            None,
        );

        app.slack_runner.start().await.expect("noop transport closes cleanly");
        assert_eq!(app.dispatcher.handler_count(), 3);
        assert_eq!(Arc::strong_count(&app.runtime), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn back_to_back_socket_messages_from_one_user_keep_their_order() {
        for _ in 0..25 {
            let connector = Arc::new(RecordingConnector::default());
            let transport = Arc::new(ScriptedTransport::new(vec![
                direct_message("env-1", "U1", "food"),
                direct_message("env-2", "U1", "yes"),
                direct_message("env-3", "U1", "pizza"),
            ]));
            let app = assemble(
                valid_config("http://127.0.0.1:9"),
                connector.clone(),
                Arc::new(FixedSearch::default()),
                transport,
                Some("UBOT".to_owned()),
            );

            app.slack_runner.start().await.expect("scripted transport closes cleanly");

            assert_eq!(
                connector.texts(),
                vec![
                    CONFIRMATION_PROMPT.to_owned(),
                    FOOD_TYPE_PROMPT.to_owned(),
                    "pizza? Sounds good!".to_owned(),
                    LOCATION_PROMPT.to_owned(),
                ]
            );
        }
    }
}
