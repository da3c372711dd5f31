use tokio::sync::RwLock;

use crate::{
    db::store::CatalogStore,
    error::AppResult,
    models::{Movie, Rating},
};

/// In-memory [`CatalogStore`] implementation
///
/// Stands in for the external document store in the demo binary and the
/// integration tests. Not intended for production persistence.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    movies: Vec<Movie>,
    ratings: Vec<Rating>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a rating record, as the write path of the external store would
    pub async fn insert_rating(&self, rating: Rating) {
        self.inner.write().await.ratings.push(rating);
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn count_movies(&self) -> AppResult<usize> {
        Ok(self.inner.read().await.movies.len())
    }

    async fn fetch_all_movies(&self) -> AppResult<Vec<Movie>> {
        Ok(self.inner.read().await.movies.clone())
    }

    async fn bulk_insert_movies(&self, movies: Vec<Movie>) -> AppResult<()> {
        self.inner.write().await.movies.extend(movies);
        Ok(())
    }

    async fn ratings_for_user(&self, user_id: &str) -> AppResult<Vec<Rating>> {
        Ok(self
            .inner
            .read()
            .await
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
