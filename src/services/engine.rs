use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, RwLock};

use crate::{
    cache::{AcquireOptions, ArtifactCache, CachePriority},
    db::{dataset, store::CatalogStore},
    error::{AppError, AppResult},
    models::{round_to_tenth, Movie, Recommendation, UserProfile},
    services::training::{Interaction, LatentFactorModel, SgdTrainer, TrainingConfig},
};

/// Cache identifier under which the trained model lives
pub const MODEL_ARTIFACT_ID: &str = "recommender/latent-model";

const DEFAULT_RECOMMENDATION_COUNT: usize = 10;

/// Synthetic users in the bootstrap interaction set
const BOOTSTRAP_USER_COUNT: usize = 100;
const MIN_BOOTSTRAP_RATINGS: usize = 5;
const MAX_BOOTSTRAP_RATINGS: usize = 19;

/// Weighting of the content signal against external popularity
const GENRE_WEIGHT: f64 = 0.7;
const POPULARITY_WEIGHT: f64 = 0.3;
/// Genre score for a user with no genre history at all
const NEUTRAL_GENRE_SCORE: f64 = 3.5;
/// Candidates must beat this predicted rating to be recommended
const RECOMMENDATION_FLOOR: f64 = 3.0;

const COLD_CONFIDENCE: f64 = 0.3;
const PARTIAL_CONFIDENCE: f64 = 0.5;
const BASE_CONFIDENCE: f64 = 0.4;
const CONFIDENCE_PER_RATING: f64 = 0.05;
const FAVORITE_GENRE_BONUS: f64 = 0.2;
const MAX_CONFIDENCE: f64 = 0.9;

/// Configuration for [`RecommendationEngine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rating count at which a user switches from the cold-start path to
    /// personalized scoring
    pub min_ratings_for_personalization: usize,
    pub training: TrainingConfig,
    /// Fixed RNG seed for bootstrap synthesis and training; `None` draws
    /// from entropy
    pub training_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_ratings_for_personalization: 3,
            training: TrainingConfig::default(),
            training_seed: None,
        }
    }
}

enum EngineState {
    Uninitialized,
    Initializing,
    Ready(Arc<ReadyState>),
}

/// Everything a recommendation request reads, swapped in atomically on
/// successful initialization
struct ReadyState {
    catalog: Vec<Movie>,
    index_by_id: HashMap<u32, usize>,
    model: Arc<LatentFactorModel>,
}

/// Latent-factor recommendation engine with content-based and popularity
/// fallbacks
///
/// Initialization loads the catalog (importing the bundled dataset into an
/// empty store), synthesizes bootstrap interactions, and trains the model
/// through the artifact cache, so the trained model participates in budget
/// accounting and last-resort eviction. Once `Ready`, recommendation
/// requests are independent and read-only.
pub struct RecommendationEngine {
    store: Arc<dyn CatalogStore>,
    cache: ArtifactCache,
    config: EngineConfig,
    init_lock: Mutex<()>,
    state: RwLock<EngineState>,
}

impl RecommendationEngine {
    pub fn new(store: Arc<dyn CatalogStore>, cache: ArtifactCache, config: EngineConfig) -> Self {
        Self {
            store,
            cache,
            config,
            init_lock: Mutex::new(()),
            state: RwLock::new(EngineState::Uninitialized),
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, EngineState::Ready(_))
    }

    /// Loads the catalog and trains the model; idempotent
    ///
    /// Concurrent callers collapse into a single initialization: whoever
    /// queues behind the winner observes `Ready` and returns immediately.
    /// On failure the engine reverts to `Uninitialized` so the call can be
    /// retried.
    pub async fn initialize(&self) -> AppResult<()> {
        if self.is_ready().await {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.is_ready().await {
            return Ok(());
        }

        *self.state.write().await = EngineState::Initializing;
        tracing::info!("Initializing recommendation engine");
        let started = Instant::now();

        match self.build_ready_state().await {
            Ok(ready) => {
                tracing::info!(
                    movie_count = ready.catalog.len(),
                    trained_users = ready.model.user_count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Recommendation engine ready"
                );
                *self.state.write().await = EngineState::Ready(Arc::new(ready));
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = EngineState::Uninitialized;
                tracing::error!(error = %e, "Engine initialization failed");
                let reason = e.to_string();
                Err(match e {
                    err @ AppError::InitializationFailed { .. } => err,
                    _ => AppError::InitializationFailed { reason },
                })
            }
        }
    }

    async fn build_ready_state(&self) -> AppResult<ReadyState> {
        let catalog = self.load_catalog().await?;
        if catalog.is_empty() {
            return Err(AppError::InitializationFailed {
                reason: "catalog is empty after load".to_string(),
            });
        }

        let model = self.train_model(catalog.len()).await?;
        let index_by_id = catalog
            .iter()
            .enumerate()
            .map(|(index, movie)| (movie.id, index))
            .collect();

        Ok(ReadyState {
            catalog,
            index_by_id,
            model,
        })
    }

    /// Fetches the catalog, importing the bundled dataset into an empty store
    async fn load_catalog(&self) -> AppResult<Vec<Movie>> {
        let count = self.store.count_movies().await?;
        if count == 0 {
            let movies = dataset::parse_catalog(dataset::BUNDLED_DATASET)?;
            tracing::info!(
                movie_count = movies.len(),
                "Store is empty, importing bundled catalog"
            );
            self.store.bulk_insert_movies(movies.clone()).await?;
            Ok(movies)
        } else {
            tracing::debug!(movie_count = count, "Loading catalog from store");
            self.store.fetch_all_movies().await
        }
    }

    /// Trains the model through the cache so it is budget-accounted and
    /// deduplicated across concurrent initializations
    async fn train_model(&self, item_count: usize) -> AppResult<Arc<LatentFactorModel>> {
        let training = self.config.training.clone();
        let seed = self.config.training_seed;

        let payload = self
            .cache
            .acquire(
                MODEL_ARTIFACT_ID,
                move || async move {
                    // Training is CPU-bound and non-interruptible; keep it off
                    // the async workers
                    let model = tokio::task::spawn_blocking(move || {
                        let mut rng = match seed {
                            Some(seed) => StdRng::seed_from_u64(seed),
                            None => StdRng::from_entropy(),
                        };
                        let interactions = synthesize_bootstrap(item_count, &mut rng);
                        SgdTrainer::from_rng(training, rng).train(
                            &interactions,
                            BOOTSTRAP_USER_COUNT,
                            item_count,
                        )
                    })
                    .await?;
                    Ok(Arc::new(model) as Arc<dyn crate::cache::Artifact>)
                },
                AcquireOptions::with_priority(CachePriority::High),
            )
            .await?;

        payload
            .as_any()
            .downcast::<LatentFactorModel>()
            .map_err(|_| AppError::InitializationFailed {
                reason: format!("cached artifact '{MODEL_ARTIFACT_ID}' is not a latent-factor model"),
            })
    }

    async fn ready_state(&self) -> AppResult<Arc<ReadyState>> {
        match &*self.state.read().await {
            EngineState::Ready(ready) => Ok(ready.clone()),
            _ => Err(AppError::ModelUnavailable),
        }
    }

    /// Raw model prediction for a trained user index and a catalog movie,
    /// clamped to the 1-5 rating scale
    pub async fn predict_rating(&self, user_index: usize, movie_id: u32) -> AppResult<f64> {
        let ready = self.ready_state().await?;
        let item_index = *ready
            .index_by_id
            .get(&movie_id)
            .ok_or(AppError::ItemNotFound { movie_id })?;

        let raw = ready
            .model
            .predict(user_index, item_index)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown user index {user_index}")))?;
        Ok(raw.clamp(1.0, 5.0))
    }

    /// Produces a ranked, explained recommendation list for `user_id`
    ///
    /// Users with enough history get personalized content-weighted scores;
    /// everyone else goes through the popularity-ranked cold-start path.
    /// Movies the user has already rated never appear.
    pub async fn generate_recommendations(
        &self,
        user_id: &str,
        count: Option<usize>,
    ) -> AppResult<Vec<Recommendation>> {
        let ready = self.ready_state().await?;
        let count = count.unwrap_or(DEFAULT_RECOMMENDATION_COUNT);

        let history = self.store.ratings_for_user(user_id).await?;
        let profile = UserProfile::from_ratings(&history);
        let personalized = profile.rating_count() >= self.config.min_ratings_for_personalization;

        let recommendations = if personalized {
            self.personalized_recommendations(&ready, &profile, count)
        } else {
            self.cold_start_recommendations(&ready, &profile, count)
        };

        tracing::info!(
            user_id = %user_id,
            rating_count = profile.rating_count(),
            personalized,
            returned = recommendations.len(),
            "Generated recommendations"
        );
        Ok(recommendations)
    }

    /// Content-weighted scoring for users with enough rating history
    fn personalized_recommendations(
        &self,
        ready: &ReadyState,
        profile: &UserProfile,
        count: usize,
    ) -> Vec<Recommendation> {
        let generated_at = Utc::now();
        let mut scored: Vec<(f64, &Movie)> = Vec::new();

        for movie in &ready.catalog {
            if profile.has_rated(movie.id) {
                continue;
            }

            let shared_preferences: Vec<f64> = movie
                .genres
                .iter()
                .filter_map(|genre| profile.genre_preferences.get(genre).copied())
                .collect();
            let genre_score = if shared_preferences.is_empty() {
                profile.mean_rating().unwrap_or(NEUTRAL_GENRE_SCORE)
            } else {
                shared_preferences.iter().sum::<f64>() / shared_preferences.len() as f64
            };

            let predicted = (GENRE_WEIGHT * genre_score
                + POPULARITY_WEIGHT * movie.average_rating / 2.0)
                .clamp(1.0, 5.0);
            if predicted <= RECOMMENDATION_FLOOR {
                continue;
            }

            scored.push((predicted, movie));
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(count);

        scored
            .into_iter()
            .map(|(predicted, movie)| {
                let favorite_overlap = movie
                    .genres
                    .iter()
                    .any(|genre| profile.is_favorite_genre(genre));
                let confidence = (BASE_CONFIDENCE
                    + CONFIDENCE_PER_RATING * profile.rating_count() as f64
                    + if favorite_overlap {
                        FAVORITE_GENRE_BONUS
                    } else {
                        0.0
                    })
                .min(MAX_CONFIDENCE);

                Recommendation {
                    movie_id: movie.id,
                    title: movie.title.clone(),
                    predicted_rating: round_to_tenth(predicted),
                    confidence,
                    genres: movie.genres.clone(),
                    explanation: personalized_explanation(movie, profile, predicted),
                    generated_at,
                }
            })
            .collect()
    }

    /// Popularity-ranked fallback for users below the personalization
    /// threshold, including fully cold users
    fn cold_start_recommendations(
        &self,
        ready: &ReadyState,
        profile: &UserProfile,
        count: usize,
    ) -> Vec<Recommendation> {
        let generated_at = Utc::now();
        let preferred = profile.positively_preferred_genres();

        let mut candidates: Vec<&Movie> = ready
            .catalog
            .iter()
            .filter(|movie| !profile.has_rated(movie.id))
            // A fully cold user has no preferences to filter on
            .filter(|movie| {
                profile.rating_count() == 0 || movie.shares_genre(preferred.iter().copied())
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.popularity_score()
                .partial_cmp(&a.popularity_score())
                .unwrap_or(Ordering::Equal)
        });

        let confidence = if profile.rating_count() == 0 {
            COLD_CONFIDENCE
        } else {
            PARTIAL_CONFIDENCE
        };

        candidates
            .into_iter()
            .take(count)
            .map(|movie| Recommendation {
                movie_id: movie.id,
                title: movie.title.clone(),
                predicted_rating: round_to_tenth((movie.average_rating / 2.0).clamp(1.0, 5.0)),
                confidence,
                genres: movie.genres.clone(),
                explanation: popularity_explanation(movie),
                generated_at,
            })
            .collect()
    }

    /// Case-insensitive substring search over catalog titles
    pub async fn search_movies(&self, query: &str) -> AppResult<Vec<Movie>> {
        let ready = self.ready_state().await?;
        let needle = query.to_lowercase();
        Ok(ready
            .catalog
            .iter()
            .filter(|movie| movie.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    pub async fn movies_by_genre(&self, genre: &str) -> AppResult<Vec<Movie>> {
        let ready = self.ready_state().await?;
        Ok(ready
            .catalog
            .iter()
            .filter(|movie| movie.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)))
            .cloned()
            .collect())
    }

    /// Distinct genres across the catalog, sorted
    pub async fn genres(&self) -> AppResult<Vec<String>> {
        let ready = self.ready_state().await?;
        let distinct: BTreeSet<&String> =
            ready.catalog.iter().flat_map(|movie| &movie.genres).collect();
        Ok(distinct.into_iter().cloned().collect())
    }

    pub async fn movie_by_id(&self, movie_id: u32) -> AppResult<Movie> {
        let ready = self.ready_state().await?;
        ready
            .index_by_id
            .get(&movie_id)
            .map(|&index| ready.catalog[index].clone())
            .ok_or(AppError::ItemNotFound { movie_id })
    }
}

/// Synthesizes bootstrap interactions: each synthetic user rates a random
/// 5-19 movie subset with ratings clustered in the 3-5 range
fn synthesize_bootstrap(item_count: usize, rng: &mut StdRng) -> Vec<Interaction> {
    let mut interactions = Vec::new();
    for user_index in 0..BOOTSTRAP_USER_COUNT {
        let sample_size = rng
            .gen_range(MIN_BOOTSTRAP_RATINGS..=MAX_BOOTSTRAP_RATINGS)
            .min(item_count);
        for item_index in rand::seq::index::sample(rng, item_count, sample_size) {
            interactions.push(Interaction {
                user_index,
                item_index,
                rating: bootstrap_rating(rng),
            });
        }
    }
    tracing::debug!(
        interaction_count = interactions.len(),
        "Synthesized bootstrap interactions"
    );
    interactions
}

/// Bounded rating draw: 10% land on 1-2, the rest cluster in 3-5
fn bootstrap_rating(rng: &mut StdRng) -> f64 {
    let roll: f64 = rng.gen();
    if roll < 0.10 {
        rng.gen_range(1..=2) as f64
    } else if roll < 0.40 {
        3.0
    } else if roll < 0.75 {
        4.0
    } else {
        5.0
    }
}

fn personalized_explanation(movie: &Movie, profile: &UserProfile, predicted: f64) -> String {
    let favorites: Vec<&str> = movie
        .genres
        .iter()
        .filter(|genre| profile.is_favorite_genre(genre))
        .map(|genre| genre.as_str())
        .collect();

    if favorites.is_empty() {
        popularity_explanation(movie)
    } else {
        format!(
            "Because you enjoy {} (predicted rating: {:.1})",
            join_natural(&favorites),
            predicted
        )
    }
}

fn popularity_explanation(movie: &Movie) -> String {
    format!(
        "Popular with audiences, rated {:.1}/10 across {} ratings",
        movie.average_rating, movie.rating_count
    )
}

/// Joins items in natural-language list form: "X, Y and Z"
fn join_natural(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
