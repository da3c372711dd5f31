use std::collections::HashMap;

use crate::models::Rating;

/// Genre-preference level above which a genre counts as a favorite, used for
/// explanation text and confidence bonuses
pub const PREFERENCE_THRESHOLD: f64 = 3.5;

/// Preference level above which a genre steers cold-start filtering
const POSITIVE_PREFERENCE: f64 = 3.0;

/// Derived per-request view of one user's taste
///
/// Computed fresh from the user's rating history on every recommendation
/// request; never cached or shared across users.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    /// Movie id -> the user's rating
    pub ratings: HashMap<u32, f64>,
    /// Genre -> the user's mean rating across movies tagged with it
    pub genre_preferences: HashMap<String, f64>,
}

impl UserProfile {
    /// Builds a profile from a user's rating history
    pub fn from_ratings(history: &[Rating]) -> Self {
        let mut ratings = HashMap::new();
        let mut genre_sums: HashMap<String, (f64, usize)> = HashMap::new();

        for record in history {
            ratings.insert(record.movie_id, record.rating);
            for genre in &record.genres {
                let entry = genre_sums.entry(genre.clone()).or_insert((0.0, 0));
                entry.0 += record.rating;
                entry.1 += 1;
            }
        }

        let genre_preferences = genre_sums
            .into_iter()
            .map(|(genre, (sum, count))| (genre, sum / count as f64))
            .collect();

        Self {
            ratings,
            genre_preferences,
        }
    }

    /// Number of distinct movies the user has rated
    pub fn rating_count(&self) -> usize {
        self.ratings.len()
    }

    pub fn has_rated(&self, movie_id: u32) -> bool {
        self.ratings.contains_key(&movie_id)
    }

    /// Mean across all of the user's ratings, if any exist
    pub fn mean_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        Some(self.ratings.values().sum::<f64>() / self.ratings.len() as f64)
    }

    /// Genres the user rates favorably, used to filter cold-start candidates
    pub fn positively_preferred_genres(&self) -> Vec<&str> {
        self.genre_preferences
            .iter()
            .filter(|(_, &pref)| pref > POSITIVE_PREFERENCE)
            .map(|(genre, _)| genre.as_str())
            .collect()
    }

    /// Whether the user's preference for `genre` exceeds the favorite threshold
    pub fn is_favorite_genre(&self, genre: &str) -> bool {
        self.genre_preferences
            .get(genre)
            .is_some_and(|&pref| pref > PREFERENCE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Rating> {
        vec![
            Rating::new("u1", 1, 5.0, &["Drama"], "The Shawshank Redemption"),
            Rating::new("u1", 2, 4.0, &["Crime", "Drama"], "The Godfather"),
            Rating::new("u1", 3, 2.0, &["Action", "Sci-Fi"], "The Matrix"),
        ]
    }

    #[test]
    fn test_from_ratings_indexes_by_movie() {
        let profile = UserProfile::from_ratings(&history());
        assert_eq!(profile.rating_count(), 3);
        assert!(profile.has_rated(2));
        assert!(!profile.has_rated(99));
    }

    #[test]
    fn test_genre_preferences_are_means() {
        let profile = UserProfile::from_ratings(&history());
        // Drama appears in two ratings: (5 + 4) / 2
        assert_eq!(profile.genre_preferences["Drama"], 4.5);
        assert_eq!(profile.genre_preferences["Crime"], 4.0);
        assert_eq!(profile.genre_preferences["Action"], 2.0);
    }

    #[test]
    fn test_mean_rating() {
        let profile = UserProfile::from_ratings(&history());
        assert!((profile.mean_rating().unwrap() - 11.0 / 3.0).abs() < 1e-9);
        assert!(UserProfile::default().mean_rating().is_none());
    }

    #[test]
    fn test_positively_preferred_genres_excludes_disliked() {
        let profile = UserProfile::from_ratings(&history());
        let mut preferred = profile.positively_preferred_genres();
        preferred.sort_unstable();
        assert_eq!(preferred, vec!["Crime", "Drama"]);
    }

    #[test]
    fn test_favorite_genre_threshold() {
        let profile = UserProfile::from_ratings(&history());
        assert!(profile.is_favorite_genre("Drama"));
        // Exactly 4.0 > 3.5 holds; 2.0 does not
        assert!(profile.is_favorite_genre("Crime"));
        assert!(!profile.is_favorite_genre("Action"));
        assert!(!profile.is_favorite_genre("Western"));
    }

    #[test]
    fn test_empty_history_yields_empty_profile() {
        let profile = UserProfile::from_ratings(&[]);
        assert_eq!(profile.rating_count(), 0);
        assert!(profile.genre_preferences.is_empty());
        assert!(profile.positively_preferred_genres().is_empty());
    }
}
