use serde::{Deserialize, Serialize};

/// Upper bound on recommendations announced per completed dialogue.
pub const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub term: String,
    pub location: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub name: String,
    pub url: String,
    pub rating: f64,
    pub review_count: u32,
    pub image_url: String,
}

impl Business {
    /// Body line shown under the business title.
    pub fn summary_text(&self) -> String {
        format!("Rating: {}/5\nReviews:{}", self.rating, self.review_count)
    }
}

/// The first `MAX_RECOMMENDATIONS` businesses of a search, in the order received.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    businesses: Vec<Business>,
}

impl RecommendationResult {
    pub fn from_search(businesses: Vec<Business>) -> Self {
        let mut businesses = businesses;
        businesses.truncate(MAX_RECOMMENDATIONS);
        Self { businesses }
    }

    pub fn businesses(&self) -> &[Business] {
        &self.businesses
    }

    pub fn is_empty(&self) -> bool {
        self.businesses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.businesses.len()
    }

    pub fn into_businesses(self) -> Vec<Business> {
        self.businesses
    }
}
