use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single ranked recommendation returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub movie_id: u32,
    pub title: String,
    /// Predicted rating on the 1-5 scale, rounded to one decimal
    pub predicted_rating: f64,
    /// Confidence in the prediction, in [0, 1]
    pub confidence: f64,
    pub genres: Vec<String>,
    /// Human-readable justification for the recommendation
    pub explanation: String,
    pub generated_at: DateTime<Utc>,
}

/// Rounds to the one-decimal precision consumers expect
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
