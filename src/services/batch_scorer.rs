use crate::{
    error::{AppError, AppResult},
    models::{AggregatedPreference, DestinationCatalog, DestinationRecord, Recommendation},
    services::scoring::Regressor,
};

/// A catalog entry with its predicted compatibility score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDestination<'a> {
    pub destination: &'a DestinationRecord,
    pub score: f64,
}

impl From<ScoredDestination<'_>> for Recommendation {
    fn from(scored: ScoredDestination<'_>) -> Self {
        Self {
            name: scored.destination.name.clone(),
            province: scored.destination.province.clone(),
            canton: scored.destination.canton.clone(),
            predicted_score: scored.score,
        }
    }
}

/// Ranks every destination against one aggregated family preference
///
/// Each row keeps its own stored ratings except for the categories present
/// in `preference`, which take the family's value. The result is sorted by
/// descending score, ties in catalog order, and truncated to `top_k`.
pub fn rank_destinations<'a>(
    preference: &AggregatedPreference,
    catalog: &'a DestinationCatalog,
    model: &dyn Regressor,
    top_k: i64,
) -> AppResult<Vec<ScoredDestination<'a>>> {
    if top_k <= 0 {
        return Err(AppError::InvalidRequest(format!(
            "top_k must be a positive integer, got {}",
            top_k
        )));
    }

    let mut scored = catalog
        .iter()
        .map(|destination| {
            let features = destination.ratings.overridden_by(preference);
            model.predict(&features).map(|score| ScoredDestination { destination, score })
        })
        .collect::<AppResult<Vec<_>>>()?;

    // `sort_by` is stable, so equal scores stay in catalog order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(usize::try_from(top_k).unwrap_or(usize::MAX));

    tracing::debug!(
        catalog_size = catalog.len(),
        returned = scored.len(),
        top_score = scored.first().map(|s| s.score),
        "Destinations ranked"
    );

    Ok(scored)
}
