use std::sync::Arc;

use cinerec::{
    cache::ArtifactCache,
    config::Config,
    db::InMemoryStore,
    models::Rating,
    services::engine::RecommendationEngine,
};

/// Demo wiring: in-memory store, artifact cache, and one recommendation run
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinerec=info".into()),
        )
        .init();

    let store = Arc::new(InMemoryStore::new());
    let (cache, sweeper) = ArtifactCache::new(config.cache_config());
    let engine = RecommendationEngine::new(store.clone(), cache, config.engine_config());

    engine.initialize().await?;

    for rating in [
        Rating::new("demo", 1, 5.0, &["Drama"], "The Shawshank Redemption"),
        Rating::new("demo", 2, 5.0, &["Crime", "Drama"], "The Godfather"),
        Rating::new("demo", 3, 4.0, &["Action", "Crime", "Drama"], "The Dark Knight"),
    ] {
        store.insert_rating(rating).await;
    }

    let recommendations = engine.generate_recommendations("demo", Some(5)).await?;
    for rec in &recommendations {
        tracing::info!(
            movie_id = rec.movie_id,
            title = %rec.title,
            predicted_rating = rec.predicted_rating,
            confidence = rec.confidence,
            explanation = %rec.explanation,
            "Recommendation"
        );
    }

    sweeper.shutdown().await;
    Ok(())
}
