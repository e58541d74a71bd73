//! Chowbot Yelp - Yelp Fusion business search
//!
//! Implements `chowbot_core::ports::BusinessSearch` against
//! `GET /v3/businesses/search`. Results keep Yelp's ordering; trimming to the
//! announced maximum happens in the runtime.

use std::time::Duration;

use async_trait::async_trait;
use chowbot_core::config::YelpConfig;
use chowbot_core::domain::business::{Business, SearchQuery};
use chowbot_core::errors::SearchError;
use chowbot_core::ports::BusinessSearch;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

const SEARCH_PATH: &str = "/v3/businesses/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<YelpBusiness>,
}

#[derive(Debug, Deserialize)]
struct YelpBusiness {
    name: String,
    url: String,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    review_count: u32,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<YelpBusiness> for Business {
    fn from(business: YelpBusiness) -> Self {
        Self {
            name: business.name,
            url: business.url,
            rating: business.rating,
            review_count: business.review_count,
            image_url: business.image_url.unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct YelpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    timeout_secs: u64,
}

impl YelpClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chowbot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
            timeout_secs,
        })
    }

    pub fn from_config(config: &YelpConfig) -> Result<Self, SearchError> {
        Self::new(&config.base_url, config.api_key.clone(), config.timeout_secs)
    }

    fn transport_error(&self, error: reqwest::Error) -> SearchError {
        if error.is_timeout() {
            SearchError::Timeout { millis: self.timeout_secs.saturating_mul(1_000) }
        } else {
            SearchError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl BusinessSearch for YelpClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Business>, SearchError> {
        let response = self
            .http
            .get(format!("{}{SEARCH_PATH}", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .query(&[("term", query.term.as_str()), ("location", query.location.as_str())])
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status: status.as_u16(), body });
        }

        let body = response.text().await.map_err(|error| self.transport_error(error))?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|error| SearchError::Decode(error.to_string()))?;

        debug!(
            event_name = "egress.yelp.search_completed",
            term = %query.term,
            location = %query.location,
            result_count = parsed.businesses.len(),
            "yelp search completed"
        );

        Ok(parsed.businesses.into_iter().map(Business::from).collect())
    }
}
