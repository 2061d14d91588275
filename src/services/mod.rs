pub mod aggregator;
pub mod batch_scorer;
pub mod dataset;
pub mod persistence;
pub mod recommendations;
pub mod scoring;

pub use persistence::{CsvRecordStore, RecordStore};
pub use recommendations::RecommendationService;
pub use scoring::{ModelParams, Regressor, ScoringModel};
