use std::collections::HashMap;

use super::rating::{FeatureVector, RatingCategory};
use crate::error::{AppError, AppResult};

/// One row of the historical review dataset
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub name: String,
    pub province: String,
    pub canton: String,
    pub parish: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub ratings: FeatureVector,
    /// Ground-truth or synthetic target, when the file carries one
    pub score: Option<f64>,
}

/// A candidate destination with its mean historical rating per category
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRecord {
    pub name: String,
    pub province: String,
    pub canton: String,
    pub parish: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub ratings: FeatureVector,
}

/// Read-only set of destinations scored on every request
#[derive(Debug, Clone, Default)]
pub struct DestinationCatalog {
    destinations: Vec<DestinationRecord>,
}

impl DestinationCatalog {
    pub fn new(destinations: Vec<DestinationRecord>) -> Self {
        Self { destinations }
    }

    /// Groups review rows by destination name, keeping first-seen order
    ///
    /// Ratings are averaged per category, location labels come from the
    /// first review and coordinates are the median of the parsable values.
    pub fn from_reviews(rows: &[ReviewRow]) -> AppResult<Self> {
        if rows.is_empty() {
            return Err(AppError::DataUnavailable(
                "Cannot build a destination catalog from an empty dataset".to_string(),
            ));
        }

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<&str, Vec<&ReviewRow>> = HashMap::new();

        for row in rows {
            let group = groups.entry(row.name.as_str()).or_default();
            if group.is_empty() {
                order.push(row.name.clone());
            }
            group.push(row);
        }

        let destinations = order
            .iter()
            .filter_map(|name| groups.get(name.as_str()))
            .map(|group| summarize(group))
            .collect::<Vec<_>>();

        tracing::debug!(
            reviews = rows.len(),
            destinations = destinations.len(),
            "Destination catalog built"
        );

        Ok(Self { destinations })
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DestinationRecord> {
        self.destinations.iter()
    }

    pub fn get(&self, index: usize) -> Option<&DestinationRecord> {
        self.destinations.get(index)
    }
}

fn summarize(group: &[&ReviewRow]) -> DestinationRecord {
    let first = group[0];
    let count = group.len() as f64;

    let mut ratings = FeatureVector::zeros();
    for category in RatingCategory::ALL {
        let sum: f64 = group.iter().map(|row| row.ratings[category]).sum();
        ratings.set(category, sum / count);
    }

    DestinationRecord {
        name: first.name.clone(),
        province: first.province.clone(),
        canton: first.canton.clone(),
        parish: first.parish.clone(),
        lat: median(group.iter().filter_map(|row| row.lat).collect()),
        lon: median(group.iter().filter_map(|row| row.lon).collect()),
        ratings,
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
