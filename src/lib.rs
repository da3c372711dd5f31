//! Model lifecycle and inference core for the cinerec recommendation product.
//!
//! Two components, loaded bottom-up: an in-process [`cache::ArtifactCache`]
//! that owns the lifecycle of expensive computational artifacts, and a
//! [`services::engine::RecommendationEngine`] that trains a latent-factor
//! model over bootstrap interaction data and serves ranked, explained
//! recommendations with content-based and popularity fallbacks for users
//! with thin history.
//!
//! HTTP transport, persistent storage, and UI are external collaborators;
//! storage is reached through the [`db::store::CatalogStore`] trait.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
