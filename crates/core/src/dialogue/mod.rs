pub mod engine;
pub mod states;

pub use engine::{
    DialogueDefinition, DialogueEngine, DialogueTransitionError, FoodRecommendationDialogue,
    BAD_RESPONSE_REPLY, CONFIRMATION_PROMPT, DECLINED_REPLY, FOOD_TYPE_PROMPT, LOCATION_PROMPT,
    SEARCHING_REPLY,
};
pub use states::{Confirmation, DialogueAction, DialogueSession, DialogueStep, TransitionOutcome};
