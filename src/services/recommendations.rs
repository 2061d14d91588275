use std::{path::Path, sync::Arc};

use crate::{
    error::{AppError, AppResult},
    models::{DestinationCatalog, FamilyMember, PreferenceMatcher, Recommendation},
    services::{
        aggregator::aggregate_preferences,
        batch_scorer::rank_destinations,
        dataset::HistoricalDataset,
        scoring::{ModelParams, Regressor, ScoringModel},
    },
};

/// Generates destination recommendations for a family
///
/// Built once at startup and shared read-only by every request: the key
/// matcher, the trained model and the destination catalog never change
/// while the service runs.
#[derive(Clone)]
pub struct RecommendationService {
    matcher: PreferenceMatcher,
    model: Arc<dyn Regressor>,
    catalog: Arc<DestinationCatalog>,
}

impl RecommendationService {
    pub fn new(model: Arc<dyn Regressor>, catalog: Arc<DestinationCatalog>) -> Self {
        Self {
            matcher: PreferenceMatcher::new(),
            model,
            catalog,
        }
    }

    /// Loads the historical dataset, trains the model and builds the catalog
    ///
    /// Runs on the blocking pool; any failure here should stop the service
    /// from accepting traffic.
    pub async fn bootstrap(data_path: impl AsRef<Path>, params: ModelParams) -> AppResult<Self> {
        let data_path = data_path.as_ref().to_path_buf();

        tokio::task::spawn_blocking(move || -> AppResult<Self> {
            let dataset = HistoricalDataset::load(&data_path)?;
            let records = dataset.training_records()?;

            let mut model = ScoringModel::new(params);
            model.train(&records)?;

            let catalog = DestinationCatalog::from_reviews(dataset.rows())?;
            tracing::info!(destinations = catalog.len(), "Recommendation service ready");

            Ok(Self::new(Arc::new(model), Arc::new(catalog)))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub fn catalog(&self) -> &DestinationCatalog {
        &self.catalog
    }

    /// Aggregates the family's ratings and returns the `top_k` best destinations
    pub fn recommend(
        &self,
        members: &[FamilyMember],
        top_k: i64,
    ) -> AppResult<Vec<Recommendation>> {
        let preference = aggregate_preferences(members, &self.matcher)?;
        let ranked = rank_destinations(&preference, &self.catalog, self.model.as_ref(), top_k)?;
        Ok(ranked.into_iter().map(Recommendation::from).collect())
    }
}
