use serde::{Deserialize, Serialize};

/// A catalog movie
///
/// Loaded once at engine initialization and immutable afterwards. The
/// `average_rating` is an external popularity signal on a 0-10 scale,
/// distinct from the 1-5 scale users rate on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    /// Catalog identifier, assigned as 1-based import order
    pub id: u32,
    pub title: String,
    /// Ordered genre tags; the same genre may appear across many movies
    pub genres: Vec<String>,
    pub year: i32,
    /// External popularity signal on a 0-10 scale
    pub average_rating: f64,
    pub rating_count: u64,
}

impl Movie {
    /// Popularity/credibility blend used to rank cold-start candidates.
    ///
    /// A single-vote movie scores zero so sparse entries cannot outrank
    /// well-established ones.
    pub fn popularity_score(&self) -> f64 {
        self.average_rating * (self.rating_count.max(1) as f64).ln()
    }

    /// Whether this movie carries any of the given genres
    pub fn shares_genre<'a, I>(&self, genres: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut genres = genres.into_iter();
        genres.any(|g| self.genres.iter().any(|own| own == g))
    }
}
