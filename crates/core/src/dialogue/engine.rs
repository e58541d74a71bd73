use thiserror::Error;

use crate::dialogue::states::{
    Confirmation, DialogueAction, DialogueSession, DialogueStep, TransitionOutcome,
};
use crate::domain::business::SearchQuery;
use crate::matching::MatchPolicy;

pub const CONFIRMATION_PROMPT: &str = "Would you like food recommendations near you?";
pub const FOOD_TYPE_PROMPT: &str = "Great! What type of food are you interested in?";
pub const LOCATION_PROMPT: &str = "Where are you?";
pub const DECLINED_REPLY: &str = "Okay! Goodbye.";
pub const BAD_RESPONSE_REPLY: &str = "Sorry, I did not understand.";
pub const SEARCHING_REPLY: &str = "Ok! Pulling up the results...";

pub trait DialogueDefinition {
    fn name(&self) -> &'static str;
    fn initial_step(&self) -> DialogueStep;
    fn entry_actions(&self, step: DialogueStep) -> Vec<DialogueAction>;
    fn transition(
        &self,
        session: &DialogueSession,
        input: &str,
    ) -> Result<TransitionOutcome, DialogueTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct FoodRecommendationDialogue {
    policy: MatchPolicy,
}

impl FoodRecommendationDialogue {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }
}

impl DialogueDefinition for FoodRecommendationDialogue {
    fn name(&self) -> &'static str {
        "food_recommendation"
    }

    fn initial_step(&self) -> DialogueStep {
        DialogueStep::Start
    }

    fn entry_actions(&self, step: DialogueStep) -> Vec<DialogueAction> {
        match step {
            DialogueStep::Start => vec![DialogueAction::Ask(CONFIRMATION_PROMPT.to_owned())],
            DialogueStep::AskFoodType => vec![DialogueAction::Ask(FOOD_TYPE_PROMPT.to_owned())],
            DialogueStep::AskLocation => vec![DialogueAction::Ask(LOCATION_PROMPT.to_owned())],
            DialogueStep::Declined => vec![DialogueAction::Say(DECLINED_REPLY.to_owned())],
            DialogueStep::BadResponse => vec![DialogueAction::Say(BAD_RESPONSE_REPLY.to_owned())],
            DialogueStep::Completed => Vec::new(),
        }
    }

    fn transition(
        &self,
        session: &DialogueSession,
        input: &str,
    ) -> Result<TransitionOutcome, DialogueTransitionError> {
        transition_food_recommendation(self, session, input)
    }
}

pub struct DialogueEngine<F> {
    dialogue: F,
}

impl<F> DialogueEngine<F>
where
    F: DialogueDefinition,
{
    pub fn new(dialogue: F) -> Self {
        Self { dialogue }
    }

    pub fn name(&self) -> &'static str {
        self.dialogue.name()
    }

    /// Opens a fresh session and returns the prompts to send on entry.
    pub fn start(&self) -> (DialogueSession, Vec<DialogueAction>) {
        let step = self.dialogue.initial_step();
        (DialogueSession::new(step), self.dialogue.entry_actions(step))
    }

    pub fn advance(
        &self,
        session: &DialogueSession,
        input: &str,
    ) -> Result<TransitionOutcome, DialogueTransitionError> {
        if session.step.is_terminal() {
            return Err(DialogueTransitionError::SessionClosed { step: session.step });
        }
        self.dialogue.transition(session, input)
    }
}

impl Default for DialogueEngine<FoodRecommendationDialogue> {
    fn default() -> Self {
        Self::new(FoodRecommendationDialogue::default())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueTransitionError {
    #[error("dialogue already finished in step {step:?}")]
    SessionClosed { step: DialogueStep },
}

fn transition_food_recommendation(
    dialogue: &FoodRecommendationDialogue,
    session: &DialogueSession,
    input: &str,
) -> Result<TransitionOutcome, DialogueTransitionError> {
    use DialogueStep::{AskFoodType, AskLocation, BadResponse, Completed, Declined, Start};

    let mut next = session.clone();
    let mut actions = Vec::new();

    let to = match session.step {
        Start => {
            if dialogue.policy.matches(input, "yes") {
                next.confirmed = Confirmation::Yes;
                AskFoodType
            } else if dialogue.policy.matches(input, "no") {
                next.confirmed = Confirmation::No;
                Declined
            } else {
                BadResponse
            }
        }
        AskFoodType => {
            next.food_type = input.to_owned();
            actions.push(DialogueAction::Say(format!("{input}? Sounds good!")));
            AskLocation
        }
        AskLocation => {
            next.location = input.to_owned();
            actions.push(DialogueAction::Say(SEARCHING_REPLY.to_owned()));
            actions.push(DialogueAction::Search(SearchQuery {
                term: next.food_type.clone(),
                location: next.location.clone(),
            }));
            Completed
        }
        Declined | BadResponse | Completed => {
            return Err(DialogueTransitionError::SessionClosed { step: session.step });
        }
    };

    actions.extend(dialogue.entry_actions(to));
    next.step = to;

    Ok(TransitionOutcome { from: session.step, to, session: next, actions })
}
