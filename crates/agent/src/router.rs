use chowbot_core::domain::message::{IncomingMessage, MessageScope};
use chowbot_core::matching::MatchPolicy;

pub const GREETING_TRIGGERS: &[&str] = &["hello", "hi", "howdy"];
pub const FOOD_TRIGGERS: &[&str] = &["hungry", "food", "lunch", "dinner"];
pub const HELP_TRIGGERS: &[&str] = &["help"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Greet,
    StartFoodDialogue,
    Help,
    Fallback,
    PublicReply,
    Ignore,
}

impl Action {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::Greet => "intent.greet",
            Self::StartFoodDialogue => "intent.start_food_dialogue",
            Self::Help => "intent.help",
            Self::Fallback => "intent.fallback",
            Self::PublicReply => "intent.public_reply",
            Self::Ignore => "intent.ignore",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentRule {
    pub action: Action,
    pub triggers: &'static [&'static str],
}

/// Phrase router. Rules are tried in registration order and the first match wins,
/// so a message containing both a greeting and a food word is a greeting.
#[derive(Clone, Debug)]
pub struct IntentRouter {
    policy: MatchPolicy,
    rules: Vec<IntentRule>,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new(MatchPolicy::default())
    }
}

impl IntentRouter {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            policy,
            rules: vec![
                IntentRule { action: Action::Greet, triggers: GREETING_TRIGGERS },
                IntentRule { action: Action::StartFoodDialogue, triggers: FOOD_TRIGGERS },
                IntentRule { action: Action::Help, triggers: HELP_TRIGGERS },
            ],
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn route(&self, message: &IncomingMessage) -> Action {
        match message.scope {
            MessageScope::OutgoingWebhook => Action::PublicReply,
            scope if !scope.is_conversational() => Action::Ignore,
            _ => self
                .rules
                .iter()
                .find(|rule| self.policy.matches_any(&message.text, rule.triggers))
                .map(|rule| rule.action)
                .unwrap_or(Action::Fallback),
        }
    }
}
