use std::sync::Arc;
use std::time::Duration;

use chowbot_core::config::DialogueConfig;
use chowbot_core::dialogue::{
    DialogueAction, DialogueEngine, DialogueStep, FoodRecommendationDialogue, TransitionOutcome,
};
use chowbot_core::domain::business::{RecommendationResult, SearchQuery};
use chowbot_core::domain::message::{IncomingMessage, MessageScope};
use chowbot_core::domain::reply::Reply;
use chowbot_core::errors::{ApplicationError, SearchError};
use chowbot_core::matching::MatchPolicy;
use chowbot_core::ports::{BusinessSearch, ChatConnector};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::router::{Action, IntentRouter};
use crate::sessions::SessionStore;

pub const HELP_REPLY: &str =
    "Hey! I can help you find restaurants on Yelp. Just type \"I'm hungry\" to get started!";
pub const FALLBACK_REPLY: &str = "Huh?";
pub const PUBLIC_REPLY: &str = "hey! here";
pub const ANONYMOUS_GREETING: &str = "Hello there!";
pub const NO_RESULTS_REPLY: &str = "I couldn't find any places matching that.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub match_policy: MatchPolicy,
    pub search_timeout: Duration,
    pub session_idle_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            search_timeout: Duration::from_secs(10),
            session_idle_timeout: Duration::from_secs(600),
        }
    }
}

impl From<&DialogueConfig> for RuntimeSettings {
    fn from(config: &DialogueConfig) -> Self {
        Self {
            match_policy: config.match_policy(),
            search_timeout: Duration::from_secs(config.search_timeout_secs),
            session_idle_timeout: Duration::from_secs(config.session_idle_timeout_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandleOutcome {
    Ignored,
    Routed(Action),
    DialogueAdvanced { session_id: Uuid, from: DialogueStep, to: DialogueStep },
    Recommended { session_id: Uuid, delivered: usize },
    SearchFailed { session_id: Uuid, error: SearchError },
}

/// Connects the router, the dialogue engine and the injected capabilities.
///
/// Shared behind an `Arc`; every method takes `&self` so several conversations can be
/// handled at once.
pub struct BotRuntime {
    connector: Arc<dyn ChatConnector>,
    search: Arc<dyn BusinessSearch>,
    router: IntentRouter,
    engine: DialogueEngine<FoodRecommendationDialogue>,
    sessions: SessionStore,
    search_timeout: Duration,
}

impl BotRuntime {
    pub fn new(
        connector: Arc<dyn ChatConnector>,
        search: Arc<dyn BusinessSearch>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            connector,
            search,
            router: IntentRouter::new(settings.match_policy),
            engine: DialogueEngine::new(FoodRecommendationDialogue::new(settings.match_policy)),
            sessions: SessionStore::new(settings.session_idle_timeout),
            search_timeout: settings.search_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle(&self, message: &IncomingMessage) -> Result<HandleOutcome, ApplicationError> {
        if message.scope != MessageScope::OutgoingWebhook {
            let key = message.conversation_key();
            if let Some(result) = self.sessions.advance(&key, &self.engine, &message.text).await {
                let outcome = result?;
                return self.run_dialogue(message, outcome).await;
            }
        }

        let action = self.router.route(message);
        info!(
            event_name = "intent.routed",
            action = action.action_key(),
            scope = message.scope.as_str(),
            channel_id = %message.channel_id,
            "routed inbound message"
        );

        match action {
            Action::Greet => self.greet(message).await?,
            Action::StartFoodDialogue => self.start_dialogue(message).await?,
            Action::Help => self.connector.reply(message, Reply::text(HELP_REPLY)).await?,
            Action::Fallback => self.connector.reply(message, Reply::text(FALLBACK_REPLY)).await?,
            Action::PublicReply => {
                self.connector.reply_public(message, Reply::text(PUBLIC_REPLY)).await?
            }
            Action::Ignore => return Ok(HandleOutcome::Ignored),
        }

        Ok(HandleOutcome::Routed(action))
    }

    async fn greet(&self, message: &IncomingMessage) -> Result<(), ApplicationError> {
        let text = match self.connector.lookup_user(&message.user_id).await {
            Ok(profile) => format!("Hello, {}!", profile.name),
            Err(error) => {
                warn!(
                    event_name = "intent.greet.lookup_failed",
                    user_id = %message.user_id,
                    error = %error,
                    "user lookup failed, greeting anonymously"
                );
                ANONYMOUS_GREETING.to_string()
            }
        };

        self.connector.reply(message, Reply::text(text)).await?;
        Ok(())
    }

    async fn start_dialogue(&self, message: &IncomingMessage) -> Result<(), ApplicationError> {
        let (session, actions) = self.engine.start();
        info!(
            event_name = "dialogue.session.started",
            session_id = %session.id,
            conversation = %message.conversation_key(),
            dialogue = self.engine.name(),
            "opened dialogue session"
        );
        self.sessions.begin(message.conversation_key(), session).await;

        for action in &actions {
            if let Some(text) = action.text() {
                self.connector.reply(message, Reply::text(text)).await?;
            }
        }
        Ok(())
    }

    async fn run_dialogue(
        &self,
        message: &IncomingMessage,
        outcome: TransitionOutcome,
    ) -> Result<HandleOutcome, ApplicationError> {
        let session_id = outcome.session.id;
        info!(
            event_name = "dialogue.transition",
            session_id = %session_id,
            from = ?outcome.from,
            to = ?outcome.to,
            "advanced dialogue session"
        );

        let mut result =
            HandleOutcome::DialogueAdvanced { session_id, from: outcome.from, to: outcome.to };

        for action in outcome.actions {
            match action {
                DialogueAction::Ask(text) | DialogueAction::Say(text) => {
                    self.connector.reply(message, Reply::text(text)).await?;
                }
                DialogueAction::Search(query) => {
                    result = self.search_and_reply(message, session_id, &query).await?;
                }
            }
        }

        Ok(result)
    }

    async fn search_and_reply(
        &self,
        message: &IncomingMessage,
        session_id: Uuid,
        query: &SearchQuery,
    ) -> Result<HandleOutcome, ApplicationError> {
        let searched = match tokio::time::timeout(self.search_timeout, self.search.search(query))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                let millis = u64::try_from(self.search_timeout.as_millis()).unwrap_or(u64::MAX);
                Err(SearchError::Timeout { millis })
            }
        };

        match searched {
            Ok(businesses) => {
                let recommendations = RecommendationResult::from_search(businesses);
                info!(
                    event_name = "dialogue.search.completed",
                    session_id = %session_id,
                    results = recommendations.len(),
                    "search returned"
                );

                if recommendations.is_empty() {
                    self.connector.reply(message, Reply::text(NO_RESULTS_REPLY)).await?;
                }

                let delivered = recommendations.len();
                for business in recommendations.into_businesses() {
                    self.connector.reply(message, Reply::recommendation(business)).await?;
                }
                Ok(HandleOutcome::Recommended { session_id, delivered })
            }
            Err(search_error) => {
                error!(
                    event_name = "dialogue.search.failed",
                    session_id = %session_id,
                    term = %query.term,
                    location = %query.location,
                    error = %search_error,
                    "business search failed"
                );

                let failure = ApplicationError::from(search_error.clone());
                if let Some(text) = failure.user_message() {
                    self.connector.reply(message, Reply::text(text)).await?;
                }
                Ok(HandleOutcome::SearchFailed { session_id, error: search_error })
            }
        }
    }
}
