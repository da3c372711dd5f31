use crate::{
    error::AppResult,
    models::{Movie, Rating},
};

/// External document-store contract
///
/// The persistent user/movie/rating store lives outside this subsystem; the
/// engine only depends on the narrow read/bulk-insert surface below. Any
/// backend that can count, fetch, and insert movies and fetch one user's
/// rating history can drive the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Number of movies currently stored
    async fn count_movies(&self) -> AppResult<usize>;

    /// Every stored movie, in insertion order
    async fn fetch_all_movies(&self) -> AppResult<Vec<Movie>>;

    /// Inserts a batch of movies, used for the one-time dataset import
    async fn bulk_insert_movies(&self, movies: Vec<Movie>) -> AppResult<()>;

    /// Full rating history for one user
    async fn ratings_for_user(&self, user_id: &str) -> AppResult<Vec<Rating>>;
}
