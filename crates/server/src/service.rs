use std::sync::Arc;

use async_trait::async_trait;
use chowbot_agent::{BotRuntime, HandleOutcome};
use chowbot_core::domain::message::IncomingMessage;
use chowbot_slack::events::{EventContext, EventHandlerError, MessageService};
use tracing::{debug, info, warn};

/// Feeds Slack messages into the bot runtime.
pub struct RuntimeMessageService {
    runtime: Arc<BotRuntime>,
}

impl RuntimeMessageService {
    pub fn new(runtime: Arc<BotRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl MessageService for RuntimeMessageService {
    async fn handle_message(
        &self,
        message: &IncomingMessage,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        match self.runtime.handle(message).await {
            Ok(HandleOutcome::Ignored) => {
                debug!(
                    event_name = "agent.message.ignored",
                    correlation_id = %ctx.correlation_id,
                    scope = message.scope.as_str(),
                    "message needed no reply"
                );
                Ok(())
            }
            Ok(outcome) => {
                info!(
                    event_name = "agent.message.handled",
                    correlation_id = %ctx.correlation_id,
                    scope = message.scope.as_str(),
                    channel_id = %message.channel_id,
                    outcome = ?outcome,
                    "message handled"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    event_name = "agent.message.failed",
                    correlation_id = %ctx.correlation_id,
                    scope = message.scope.as_str(),
                    channel_id = %message.channel_id,
                    error = %error,
                    "runtime failed to handle message"
                );
                Err(EventHandlerError::Message(error.to_string()))
            }
        }
    }
}
