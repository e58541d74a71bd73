//! Chowbot Core - domain model and dialogue state machine
//!
//! Everything in this crate is independent of Slack and of the search provider:
//! - **Domain** (`domain`) - inbound messages, scopes, businesses, replies
//! - **Matching** (`matching`) - phrase matching policy shared by router and dialogue
//! - **Dialogue** (`dialogue`) - the food recommendation state machine
//! - **Ports** (`ports`) - `ChatConnector` and `BusinessSearch` capability traits
//! - **Config** (`config`) - layered configuration loading and validation
//! - **Errors** (`errors`) - error taxonomy shared across crates

pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod matching;
pub mod ports;

pub use dialogue::{
    Confirmation, DialogueAction, DialogueDefinition, DialogueEngine, DialogueSession,
    DialogueStep, DialogueTransitionError, FoodRecommendationDialogue, TransitionOutcome,
};
pub use domain::business::{Business, RecommendationResult, SearchQuery, MAX_RECOMMENDATIONS};
pub use domain::message::{ConversationKey, IncomingMessage, MessageScope};
pub use domain::reply::{Reply, UserProfile};
pub use errors::{ApplicationError, ConnectorError, SearchError};
pub use matching::MatchPolicy;
pub use ports::{BusinessSearch, ChatConnector};
