use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::business::SearchQuery;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogueStep {
    Start,
    AskFoodType,
    AskLocation,
    Declined,
    BadResponse,
    Completed,
}

impl DialogueStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::BadResponse | Self::Completed)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    #[default]
    Pending,
    Yes,
    No,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSession {
    pub id: Uuid,
    pub confirmed: Confirmation,
    pub food_type: String,
    pub location: String,
    pub step: DialogueStep,
}

impl DialogueSession {
    pub fn new(step: DialogueStep) -> Self {
        Self {
            id: Uuid::new_v4(),
            confirmed: Confirmation::Pending,
            food_type: String::new(),
            location: String::new(),
            step,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.step.is_terminal()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueAction {
    /// A question; the session then waits for the user's answer.
    Ask(String),
    Say(String),
    Search(SearchQuery),
}

impl DialogueAction {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Ask(text) | Self::Say(text) => Some(text),
            Self::Search(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: DialogueStep,
    pub to: DialogueStep,
    pub session: DialogueSession,
    pub actions: Vec<DialogueAction>,
}

impl TransitionOutcome {
    pub fn is_terminal(&self) -> bool {
        self.to.is_terminal()
    }
}
