use serde::{Deserialize, Serialize};

/// A single user-movie interaction record
///
/// Owned by the external store; the engine only reads a user's full history
/// per request. Title and genres are denormalized at write time so profile
/// derivation needs no catalog join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: String,
    pub movie_id: u32,
    /// Rating on the 1-5 scale
    pub rating: f64,
    pub genres: Vec<String>,
    pub title: String,
}

impl Rating {
    pub fn new(user_id: &str, movie_id: u32, rating: f64, genres: &[&str], title: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            movie_id,
            rating,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            title: title.to_string(),
        }
    }
}
