//! Gradient-boosted regression trees for destination compatibility scores.
//!
//! Squared-error boosting with regularised leaf weights: every round fits
//! one tree to the current residual gradients on a seeded sample of rows
//! and columns, and the ensemble adds `learning_rate` times its output.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::time::Instant;

use crate::{
    error::{AppError, AppResult},
    models::{FeatureVector, RatingCategory, TrainingRecord},
};

mod tree;

pub use tree::RegressionTree;
use tree::{GradientPair, TreeParams};

/// Anything that maps a schema-ordered feature vector to a score
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> AppResult<f64>;
}

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows sampled per tree
    pub subsample: f64,
    /// Fraction of features sampled per tree
    pub colsample_bytree: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub seed: u64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            learning_rate: 0.05,
            max_depth: 6,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_alpha: 0.1,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            seed: 42,
        }
    }
}

impl ModelParams {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            reg_alpha: self.reg_alpha,
            reg_lambda: self.reg_lambda,
            min_child_weight: self.min_child_weight,
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.n_estimators == 0 {
            return Err(AppError::Config(
                "n_estimators must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if value.is_nan() || value <= 0.0 || value > 1.0 {
                return Err(AppError::Config(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.learning_rate.is_nan()
            || self.learning_rate <= 0.0
            || self.reg_lambda < 0.0
            || self.reg_alpha < 0.0
        {
            return Err(AppError::Config(
                "learning_rate must be positive and regularisation non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fitted ensemble
#[derive(Debug, Clone)]
struct Ensemble {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl Ensemble {
    fn predict_raw(&self, x: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + self.learning_rate * tree.predict(x))
    }
}

/// Destination scoring model; untrained until `train` succeeds
#[derive(Debug, Clone)]
pub struct ScoringModel {
    params: ModelParams,
    ensemble: Option<Ensemble>,
}

impl Default for ScoringModel {
    fn default() -> Self {
        Self::new(ModelParams::default())
    }
}

impl ScoringModel {
    pub fn new(params: ModelParams) -> Self {
        Self {
            params,
            ensemble: None,
        }
    }

    #[cfg(test)]
    pub fn tree_count(&self) -> usize {
        self.ensemble.as_ref().map_or(0, |e| e.trees.len())
    }

    /// Fits the ensemble, replacing any previous fit
    ///
    /// Deterministic for a given parameter set, seed and record order.
    pub fn train(&mut self, records: &[TrainingRecord]) -> AppResult<()> {
        if records.is_empty() {
            return Err(AppError::DataUnavailable(
                "Training dataset is empty".to_string(),
            ));
        }
        self.params.validate()?;

        let start = Instant::now();
        let params = &self.params;
        let tree_params = params.tree_params();

        let data: Vec<&[f64]> = records.iter().map(|r| r.features.as_slice()).collect();
        let targets: Vec<f64> = records.iter().map(|r| r.score).collect();

        let base_score = targets.iter().sum::<f64>() / targets.len() as f64;
        let mut predictions = vec![base_score; records.len()];

        let row_count = sample_size(records.len(), params.subsample);
        let feature_count = sample_size(RatingCategory::COUNT, params.colsample_bytree);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut all_rows: Vec<usize> = (0..records.len()).collect();
        let mut all_features: Vec<usize> = (0..RatingCategory::COUNT).collect();
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let gradients: Vec<GradientPair> = predictions
                .iter()
                .zip(&targets)
                .map(|(pred, y)| GradientPair {
                    grad: pred - y,
                    hess: 1.0,
                })
                .collect();

            all_rows.shuffle(&mut rng);
            all_features.shuffle(&mut rng);
            let mut rows = all_rows[..row_count].to_vec();
            let mut features = all_features[..feature_count].to_vec();
            rows.sort_unstable();
            features.sort_unstable();

            let tree = RegressionTree::fit(&data, &gradients, &rows, &features, &tree_params);

            for (prediction, x) in predictions.iter_mut().zip(&data) {
                *prediction += params.learning_rate * tree.predict(x);
            }
            trees.push(tree);
        }

        let mse = predictions
            .iter()
            .zip(&targets)
            .map(|(p, y)| (p - y).powi(2))
            .sum::<f64>()
            / targets.len() as f64;

        tracing::info!(
            records = records.len(),
            trees = trees.len(),
            training_rmse = mse.sqrt(),
            elapsed_ms = start.elapsed().as_millis(),
            "Scoring model trained"
        );

        self.ensemble = Some(Ensemble {
            base_score,
            learning_rate: params.learning_rate,
            trees,
        });
        Ok(())
    }
}

impl Regressor for ScoringModel {
    fn predict(&self, features: &FeatureVector) -> AppResult<f64> {
        let ensemble = self.ensemble.as_ref().ok_or(AppError::NotTrained)?;
        Ok(ensemble.predict_raw(features.as_slice()))
    }
}

fn sample_size(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).clamp(1, total)
}
