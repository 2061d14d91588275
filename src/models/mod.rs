use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod destination;
pub mod rating;

pub use destination::{DestinationCatalog, DestinationRecord, ReviewRow};
pub use rating::{AggregatedPreference, FeatureVector, PreferenceMatcher, RatingCategory};

/// A family member and the ratings they gave
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FamilyMember {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(alias = "rol", default)]
    pub role: String,
    /// Free-text preference key to rating (e.g. {"playas": 5})
    #[serde(
        alias = "preferencias",
        default,
        deserialize_with = "rating::deserialize_ratings"
    )]
    pub preferences: HashMap<String, f64>,
}

/// Request body for destination recommendations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FamilyRequest {
    #[serde(alias = "miembros")]
    pub members: Vec<FamilyMember>,
}

/// Query string of the recommendation endpoint
#[derive(Debug, Deserialize, Default)]
pub struct RecommendQuery {
    pub top_k: Option<i64>,
}

/// A ranked destination returned to the client
///
/// Serialized with English field names only; the Spanish aliases above
/// apply to request bodies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub name: String,
    pub province: String,
    pub canton: String,
    /// Raw model output; clients clamp it for display
    pub predicted_score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
}

/// Historical row used to fit the scoring model
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub features: FeatureVector,
    pub score: f64,
}

/// Acknowledgement returned after a record was appended
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveRecordResponse {
    pub status: String,
    pub message: String,
    /// Columns actually written, in file order
    pub columns: Vec<String>,
}
