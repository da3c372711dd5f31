use std::any::Any;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cache::Artifact;

/// Uniform init range for factor components
const FACTOR_INIT_SCALE: f64 = 0.05;

/// Hyperparameters for SGD matrix factorization
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of latent dimensions per user/item vector
    pub factor_count: usize,
    pub learning_rate: f64,
    /// L2 regularization strength applied to biases and factors
    pub regularization: f64,
    /// Number of full passes over the training data
    pub iterations: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            factor_count: 50,
            learning_rate: 0.01,
            regularization: 0.1,
            iterations: 100,
        }
    }
}

/// One (user, item, rating) training triple, index-addressed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub user_index: usize,
    pub item_index: usize,
    /// Rating on the 1-5 scale
    pub rating: f64,
}

/// Trained bilinear latent-factor model with bias terms
///
/// Predicts `global_mean + user_bias + item_bias + dot(user, item)`. Trained
/// once per engine lifetime and held immutably; there is no online or
/// incremental update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentFactorModel {
    pub user_factors: Vec<Vec<f64>>,
    pub item_factors: Vec<Vec<f64>>,
    pub user_bias: Vec<f64>,
    pub item_bias: Vec<f64>,
    /// Arithmetic mean of all training ratings
    pub global_mean: f64,
    pub factor_count: usize,
}

impl LatentFactorModel {
    pub fn user_count(&self) -> usize {
        self.user_factors.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_factors.len()
    }

    /// Raw model prediction, unclamped
    ///
    /// Returns `None` when either index is outside the trained range.
    pub fn predict(&self, user_index: usize, item_index: usize) -> Option<f64> {
        let user = self.user_factors.get(user_index)?;
        let item = self.item_factors.get(item_index)?;
        let dot: f64 = user.iter().zip(item).map(|(p, q)| p * q).sum();
        Some(self.global_mean + self.user_bias[user_index] + self.item_bias[item_index] + dot)
    }
}

impl Artifact for LatentFactorModel {
    fn estimated_size(&self) -> usize {
        let floats = (self.user_factors.len() + self.item_factors.len()) * self.factor_count
            + self.user_bias.len()
            + self.item_bias.len();
        floats * std::mem::size_of::<f64>()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Stochastic-gradient-descent trainer for [`LatentFactorModel`]
///
/// Factor initialization and per-pass shuffling both draw from an owned RNG,
/// so a seeded trainer produces identical models for a fixed dataset.
pub struct SgdTrainer {
    config: TrainingConfig,
    rng: StdRng,
}

impl SgdTrainer {
    pub fn new(config: TrainingConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::from_rng(config, rng)
    }

    /// Builds a trainer around an already-seeded RNG, so a caller can share
    /// one random stream between data synthesis and training
    pub fn from_rng(config: TrainingConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    /// Trains a model over `interactions`, consuming the trainer
    ///
    /// `user_count`/`item_count` fix the model dimensions; every interaction
    /// must index inside those ranges. Within one triple, both factor vectors
    /// step from their pre-update values (simultaneous update).
    pub fn train(
        mut self,
        interactions: &[Interaction],
        user_count: usize,
        item_count: usize,
    ) -> LatentFactorModel {
        let factor_count = self.config.factor_count;
        let lr = self.config.learning_rate;
        let reg = self.config.regularization;

        let global_mean = if interactions.is_empty() {
            0.0
        } else {
            interactions.iter().map(|i| i.rating).sum::<f64>() / interactions.len() as f64
        };

        let mut user_factors = self.random_factors(user_count, factor_count);
        let mut item_factors = self.random_factors(item_count, factor_count);
        let mut user_bias = vec![0.0; user_count];
        let mut item_bias = vec![0.0; item_count];

        let mut order: Vec<usize> = (0..interactions.len()).collect();
        for pass in 0..self.config.iterations {
            order.shuffle(&mut self.rng);
            let mut squared_error = 0.0;

            for &index in &order {
                let Interaction {
                    user_index: u,
                    item_index: i,
                    rating,
                } = interactions[index];

                let dot: f64 = user_factors[u]
                    .iter()
                    .zip(&item_factors[i])
                    .map(|(p, q)| p * q)
                    .sum();
                let prediction = global_mean + user_bias[u] + item_bias[i] + dot;
                let error = rating - prediction;
                squared_error += error * error;

                user_bias[u] += lr * (error - reg * user_bias[u]);
                item_bias[i] += lr * (error - reg * item_bias[i]);

                for f in 0..factor_count {
                    let p = user_factors[u][f];
                    let q = item_factors[i][f];
                    user_factors[u][f] = p + lr * (error * q - reg * p);
                    item_factors[i][f] = q + lr * (error * p - reg * q);
                }
            }

            if (pass + 1) % 20 == 0 && !interactions.is_empty() {
                tracing::debug!(
                    pass = pass + 1,
                    rmse = (squared_error / interactions.len() as f64).sqrt(),
                    "Training pass complete"
                );
            }
        }

        tracing::info!(
            user_count,
            item_count,
            factor_count,
            interaction_count = interactions.len(),
            "Latent-factor model trained"
        );

        LatentFactorModel {
            user_factors,
            item_factors,
            user_bias,
            item_bias,
            global_mean,
            factor_count,
        }
    }

    fn random_factors(&mut self, rows: usize, factor_count: usize) -> Vec<Vec<f64>> {
        (0..rows)
            .map(|_| {
                (0..factor_count)
                    .map(|_| self.rng.gen_range(-FACTOR_INIT_SCALE..FACTOR_INIT_SCALE))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_dataset() -> Vec<Interaction> {
        // Two users with opposite tastes over four items
        vec![
            Interaction {
                user_index: 0,
                item_index: 0,
                rating: 5.0,
            },
            Interaction {
                user_index: 0,
                item_index: 1,
                rating: 4.0,
            },
            Interaction {
                user_index: 0,
                item_index: 2,
                rating: 1.0,
            },
            Interaction {
                user_index: 1,
                item_index: 0,
                rating: 1.0,
            },
            Interaction {
                user_index: 1,
                item_index: 2,
                rating: 5.0,
            },
            Interaction {
                user_index: 1,
                item_index: 3,
                rating: 4.0,
            },
        ]
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            factor_count: 8,
            learning_rate: 0.05,
            regularization: 0.02,
            iterations: 300,
        }
    }

    #[test]
    fn test_model_dimensions_match_counts() {
        let model = SgdTrainer::new(config(), Some(7)).train(&toy_dataset(), 2, 4);
        assert_eq!(model.user_count(), 2);
        assert_eq!(model.item_count(), 4);
        assert!(model.user_factors.iter().all(|v| v.len() == 8));
        assert!(model.item_factors.iter().all(|v| v.len() == 8));
        assert_eq!(model.user_bias.len(), 2);
        assert_eq!(model.item_bias.len(), 4);
    }

    #[test]
    fn test_global_mean_is_training_mean() {
        let model = SgdTrainer::new(config(), Some(7)).train(&toy_dataset(), 2, 4);
        assert!((model.global_mean - 20.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_training_is_deterministic_for_fixed_seed() {
        let a = SgdTrainer::new(config(), Some(42)).train(&toy_dataset(), 2, 4);
        let b = SgdTrainer::new(config(), Some(42)).train(&toy_dataset(), 2, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_produce_different_factors() {
        let a = SgdTrainer::new(config(), Some(1)).train(&toy_dataset(), 2, 4);
        let b = SgdTrainer::new(config(), Some(2)).train(&toy_dataset(), 2, 4);
        assert_ne!(a.user_factors, b.user_factors);
    }

    #[test]
    fn test_model_fits_observed_ratings() {
        let model = SgdTrainer::new(config(), Some(7)).train(&toy_dataset(), 2, 4);
        for interaction in toy_dataset() {
            let predicted = model
                .predict(interaction.user_index, interaction.item_index)
                .unwrap();
            assert!(
                (predicted - interaction.rating).abs() < 1.0,
                "predicted {predicted} for observed {}",
                interaction.rating
            );
        }
    }

    #[test]
    fn test_predict_out_of_range_is_none() {
        let model = SgdTrainer::new(config(), Some(7)).train(&toy_dataset(), 2, 4);
        assert!(model.predict(2, 0).is_none());
        assert!(model.predict(0, 4).is_none());
    }

    #[test]
    fn test_empty_dataset_trains_trivial_model() {
        let model = SgdTrainer::new(config(), Some(7)).train(&[], 3, 3);
        assert_eq!(model.global_mean, 0.0);
        assert_eq!(model.user_count(), 3);
        assert!(model.user_bias.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_estimated_size_counts_all_floats() {
        let model = SgdTrainer::new(config(), Some(7)).train(&toy_dataset(), 2, 4);
        // (2 + 4) vectors of 8 factors plus 6 bias scalars
        assert_eq!(model.estimated_size(), (6 * 8 + 6) * 8);
    }
}
