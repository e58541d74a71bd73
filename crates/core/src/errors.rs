use thiserror::Error;

use crate::dialogue::DialogueTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("chat api call `{method}` failed: {message}")]
    Api { method: String, message: String },
    #[error("chat transport failure: {0}")]
    Transport(String),
    #[error("could not decode chat api response: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(String),
    #[error("search api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode search response: {0}")]
    Decode(String),
    #[error("search timed out after {millis}ms")]
    Timeout { millis: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Dialogue(#[from] DialogueTransitionError),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Text safe to show a Slack user, if the failure is worth telling them about.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Search(_) => {
                Some("Sorry, I couldn't pull up any restaurants right now. Please try again later.")
            }
            Self::Dialogue(_) | Self::Connector(_) | Self::Configuration(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dialogue::{DialogueStep, DialogueTransitionError};
    use crate::errors::{ApplicationError, ConnectorError, SearchError};

    #[test]
    fn search_failures_map_to_apology() {
        let error = ApplicationError::from(SearchError::Timeout { millis: 10_000 });

        assert_eq!(
            error.user_message(),
            Some("Sorry, I couldn't pull up any restaurants right now. Please try again later.")
        );
        assert_eq!(error.to_string(), "search timed out after 10000ms");
    }

    #[test]
    fn connector_failures_are_not_user_facing() {
        let error = ApplicationError::from(ConnectorError::Api {
            method: "users.info".to_owned(),
            message: "user_not_found".to_owned(),
        });

        assert_eq!(error.user_message(), None);
        assert!(error.to_string().contains("users.info"));
    }

    #[test]
    fn closed_dialogue_is_not_user_facing() {
        let error = ApplicationError::from(DialogueTransitionError::SessionClosed {
            step: DialogueStep::Declined,
        });

        assert_eq!(error.user_message(), None);
    }

    #[test]
    fn status_error_reports_code_and_body() {
        let error = SearchError::Status { status: 401, body: "unauthorized".to_owned() };
        assert_eq!(error.to_string(), "search api returned status 401: unauthorized");
    }
}
