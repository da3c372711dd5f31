pub mod engine;
pub mod training;

pub use engine::{EngineConfig, RecommendationEngine};
pub use training::{LatentFactorModel, SgdTrainer, TrainingConfig};
