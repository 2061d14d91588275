use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    ops::{Index, IndexMut},
};

/// Upper bound of every rating on the wire and in the datasets
pub const MAX_RATING: f64 = 5.0;

/// Prefix shared by every rating column label
pub const COLUMN_PREFIX: &str = "Calif promedio ";

/// Attraction category rated by reviewers and family members
///
/// The declaration order is the feature order used by training, inference
/// and the destination catalog. Reordering variants invalidates any
/// trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RatingCategory {
    Iglesias,
    Resorts,
    Playas,
    Parques,
    Teatros,
    Museos,
    CentrosComerciales,
    Zoologicos,
    Restaurantes,
    BaresPubs,
    ServiciosLocales,
    PizzeriasHamburgueserias,
    HotelesAlojamientos,
    Juguerias,
    GaleriasArte,
    Discotecas,
    Piscinas,
    Gimnasios,
    Panaderias,
    BellezaSpas,
    Cafeterias,
    Miradores,
    Monumentos,
    Jardines,
}

impl RatingCategory {
    pub const COUNT: usize = 24;

    /// Every category in feature order
    pub const ALL: [RatingCategory; Self::COUNT] = [
        RatingCategory::Iglesias,
        RatingCategory::Resorts,
        RatingCategory::Playas,
        RatingCategory::Parques,
        RatingCategory::Teatros,
        RatingCategory::Museos,
        RatingCategory::CentrosComerciales,
        RatingCategory::Zoologicos,
        RatingCategory::Restaurantes,
        RatingCategory::BaresPubs,
        RatingCategory::ServiciosLocales,
        RatingCategory::PizzeriasHamburgueserias,
        RatingCategory::HotelesAlojamientos,
        RatingCategory::Juguerias,
        RatingCategory::GaleriasArte,
        RatingCategory::Discotecas,
        RatingCategory::Piscinas,
        RatingCategory::Gimnasios,
        RatingCategory::Panaderias,
        RatingCategory::BellezaSpas,
        RatingCategory::Cafeterias,
        RatingCategory::Miradores,
        RatingCategory::Monumentos,
        RatingCategory::Jardines,
    ];

    /// Short key used by clients (e.g. "playas")
    pub fn key(self) -> &'static str {
        match self {
            RatingCategory::Iglesias => "iglesias",
            RatingCategory::Resorts => "resorts",
            RatingCategory::Playas => "playas",
            RatingCategory::Parques => "parques",
            RatingCategory::Teatros => "teatros",
            RatingCategory::Museos => "museos",
            RatingCategory::CentrosComerciales => "centros_comerciales",
            RatingCategory::Zoologicos => "zoologicos",
            RatingCategory::Restaurantes => "restaurantes",
            RatingCategory::BaresPubs => "bares_pubs",
            RatingCategory::ServiciosLocales => "servicios_locales",
            RatingCategory::PizzeriasHamburgueserias => "pizzerias_hamburgueserias",
            RatingCategory::HotelesAlojamientos => "hoteles_alojamientos",
            RatingCategory::Juguerias => "juguerias",
            RatingCategory::GaleriasArte => "galerias_arte",
            RatingCategory::Discotecas => "discotecas",
            RatingCategory::Piscinas => "piscinas",
            RatingCategory::Gimnasios => "gimnasios",
            RatingCategory::Panaderias => "panaderias",
            RatingCategory::BellezaSpas => "belleza_spas",
            RatingCategory::Cafeterias => "cafeterias",
            RatingCategory::Miradores => "miradores",
            RatingCategory::Monumentos => "monumentos",
            RatingCategory::Jardines => "jardines",
        }
    }

    /// Display label, which is also the column header in the dataset files
    pub fn label(self) -> String {
        format!("{}{}", COLUMN_PREFIX, self.key())
    }

    /// Position of this category in a feature vector
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Display for RatingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Dense rating vector in `RatingCategory::ALL` order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector([f64; RatingCategory::COUNT]);

impl FeatureVector {
    pub fn zeros() -> Self {
        Self::default()
    }

    pub fn get(&self, category: RatingCategory) -> f64 {
        self.0[category.index()]
    }

    pub fn set(&mut self, category: RatingCategory, value: f64) {
        self.0[category.index()] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Returns a copy with every category of `preference` replaced by its aggregated value
    pub fn overridden_by(&self, preference: &AggregatedPreference) -> Self {
        let mut merged = *self;
        for (category, value) in preference.iter() {
            merged.set(category, value);
        }
        merged
    }
}

impl From<[f64; RatingCategory::COUNT]> for FeatureVector {
    fn from(values: [f64; RatingCategory::COUNT]) -> Self {
        Self(values)
    }
}

impl Index<RatingCategory> for FeatureVector {
    type Output = f64;

    fn index(&self, category: RatingCategory) -> &f64 {
        &self.0[category.index()]
    }
}

impl IndexMut<RatingCategory> for FeatureVector {
    fn index_mut(&mut self, category: RatingCategory) -> &mut f64 {
        &mut self.0[category.index()]
    }
}

/// Mean family rating per category; only categories with at least one
/// contributing rating are present
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedPreference(BTreeMap<RatingCategory, f64>);

impl AggregatedPreference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: RatingCategory, value: f64) {
        self.0.insert(category, value);
    }

    pub fn get(&self, category: RatingCategory) -> Option<f64> {
        self.0.get(&category).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RatingCategory, f64)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    /// Dense form where absent categories read as 0.0
    pub fn to_dense(&self) -> FeatureVector {
        FeatureVector::zeros().overridden_by(self)
    }
}

impl FromIterator<(RatingCategory, f64)> for AggregatedPreference {
    fn from_iter<T: IntoIterator<Item = (RatingCategory, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Clamps a rating into `[0, MAX_RATING]`; non-finite values become 0.0
pub fn clamp_rating(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_RATING)
    } else {
        0.0
    }
}

/// Coerces a loosely typed JSON rating into a clamped number
///
/// Numbers and numeric strings are accepted; anything else counts as 0.0.
pub fn coerce_rating(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_rating(raw)
}

/// serde helper for preference maps with sanitized rating values
pub fn deserialize_ratings<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, Value> = HashMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| (key, coerce_rating(&value)))
        .collect())
}

/// Maps free-text preference keys onto rating categories
///
/// A key matches every category whose label contains it, ignoring case.
/// The match is loose on purpose: "bares" hits `bares_pubs`, the full
/// label hits exactly its own category, and a very short key can hit
/// several categories at once. Callers log those cases instead of
/// rejecting them.
#[derive(Debug, Clone)]
pub struct PreferenceMatcher {
    labels: Vec<(RatingCategory, String)>,
}

impl Default for PreferenceMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceMatcher {
    /// Builds the lowercase label table once
    pub fn new() -> Self {
        Self {
            labels: RatingCategory::ALL
                .into_iter()
                .map(|c| (c, c.label().to_lowercase()))
                .collect(),
        }
    }

    /// Categories whose label contains `key`, in feature order
    pub fn matches(&self, key: &str) -> Vec<RatingCategory> {
        let needle = key.to_lowercase();
        self.labels
            .iter()
            .filter(|(_, label)| label.contains(&needle))
            .map(|(category, _)| *category)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_order_is_declaration_order() {
        for (i, category) in RatingCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        assert_eq!(RatingCategory::ALL[0], RatingCategory::Iglesias);
        assert_eq!(RatingCategory::ALL[23], RatingCategory::Jardines);
    }

    #[test]
    fn test_labels_are_column_headers() {
        assert_eq!(RatingCategory::Playas.label(), "Calif promedio playas");
        assert_eq!(RatingCategory::BaresPubs.label(), "Calif promedio bares_pubs");
        assert_eq!(RatingCategory::Museos.to_string(), "museos");
    }

    #[test]
    fn test_matcher_short_key() {
        let matcher = PreferenceMatcher::new();
        assert_eq!(matcher.matches("playas"), vec![RatingCategory::Playas]);
        assert_eq!(matcher.matches("bares"), vec![RatingCategory::BaresPubs]);
    }

    #[test]
    fn test_matcher_is_case_insensitive_on_full_label() {
        let matcher = PreferenceMatcher::new();
        assert_eq!(
            matcher.matches("CALIF PROMEDIO Museos"),
            vec![RatingCategory::Museos]
        );
    }

    #[test]
    fn test_matcher_loose_matches() {
        let matcher = PreferenceMatcher::new();
        assert!(matcher.matches("casinos").is_empty());
        // The shared prefix hits every category
        assert_eq!(matcher.matches("calif").len(), RatingCategory::COUNT);
    }

    #[test]
    fn test_override_only_touches_aggregated_categories() {
        let mut stored = FeatureVector::zeros();
        stored.set(RatingCategory::Playas, 2.0);
        stored.set(RatingCategory::Museos, 4.0);

        let preference: AggregatedPreference =
            [(RatingCategory::Playas, 5.0)].into_iter().collect();
        let merged = stored.overridden_by(&preference);

        assert_eq!(merged[RatingCategory::Playas], 5.0);
        assert_eq!(merged[RatingCategory::Museos], 4.0);
        assert_eq!(merged[RatingCategory::Jardines], 0.0);
    }

    #[test]
    fn test_coerce_rating() {
        assert_eq!(coerce_rating(&json!(3.5)), 3.5);
        assert_eq!(coerce_rating(&json!(9)), 5.0);
        assert_eq!(coerce_rating(&json!(-1)), 0.0);
        assert_eq!(coerce_rating(&json!("4")), 4.0);
        assert_eq!(coerce_rating(&json!("mucho")), 0.0);
        assert_eq!(coerce_rating(&json!(null)), 0.0);
        assert_eq!(clamp_rating(f64::NAN), 0.0);
    }
}
