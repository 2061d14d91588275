use serde::Deserialize;

use crate::services::scoring::ModelParams;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Pipe-delimited historical review dataset (training data and catalog source)
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Append-only file receiving saved family records
    #[serde(default = "default_new_data_path")]
    pub new_data_path: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of recommendations returned when the request omits `top_k`
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    // Boosting hyperparameters
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_subsample")]
    pub subsample: f64,

    #[serde(default = "default_colsample_bytree")]
    pub colsample_bytree: f64,

    #[serde(default = "default_reg_alpha")]
    pub reg_alpha: f64,

    #[serde(default = "default_reg_lambda")]
    pub reg_lambda: f64,

    #[serde(default = "default_model_seed")]
    pub model_seed: u64,
}

fn default_data_path() -> String {
    "data/reviews.csv".to_string()
}

fn default_new_data_path() -> String {
    "data/new_records.csv".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_top_k() -> usize {
    3
}

fn default_n_estimators() -> usize {
    ModelParams::default().n_estimators
}

fn default_learning_rate() -> f64 {
    ModelParams::default().learning_rate
}

fn default_max_depth() -> usize {
    ModelParams::default().max_depth
}

fn default_subsample() -> f64 {
    ModelParams::default().subsample
}

fn default_colsample_bytree() -> f64 {
    ModelParams::default().colsample_bytree
}

fn default_reg_alpha() -> f64 {
    ModelParams::default().reg_alpha
}

fn default_reg_lambda() -> f64 {
    ModelParams::default().reg_lambda
}

fn default_model_seed() -> u64 {
    ModelParams::default().seed
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Boosting parameters assembled from the environment
    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            subsample: self.subsample,
            colsample_bytree: self.colsample_bytree,
            reg_alpha: self.reg_alpha,
            reg_lambda: self.reg_lambda,
            seed: self.model_seed,
            ..ModelParams::default()
        }
    }
}
