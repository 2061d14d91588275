use std::collections::BTreeMap;

use crate::{
    error::{AppError, AppResult},
    models::{AggregatedPreference, FamilyMember, PreferenceMatcher, RatingCategory},
};

/// Combines the family's ratings into one mean rating per category
///
/// Each preference key contributes its rating to every category whose
/// label contains the key (see [`PreferenceMatcher`]). Categories nobody
/// rated are left out of the result. Ratings are expected to be sanitized
/// already; see `models::rating::coerce_rating`.
pub fn aggregate_preferences(
    members: &[FamilyMember],
    matcher: &PreferenceMatcher,
) -> AppResult<AggregatedPreference> {
    if members.is_empty() {
        return Err(AppError::InvalidRequest(
            "No family members were provided".to_string(),
        ));
    }

    let mut totals: BTreeMap<RatingCategory, (f64, usize)> = BTreeMap::new();

    for member in members {
        // Sorted keys keep log output stable between runs
        let mut keys: Vec<&String> = member.preferences.keys().collect();
        keys.sort();

        for key in keys {
            let rating = member.preferences[key];
            let categories = matcher.matches(key);

            match categories.len() {
                0 => tracing::warn!(
                    member = %member.name,
                    key = %key,
                    "Preference key matches no rating category"
                ),
                1 => {}
                n => tracing::info!(
                    member = %member.name,
                    key = %key,
                    matched = n,
                    "Preference key matches several rating categories"
                ),
            }

            for category in categories {
                let entry = totals.entry(category).or_insert((0.0, 0));
                entry.0 += rating;
                entry.1 += 1;
            }
        }
    }

    let aggregated: AggregatedPreference = totals
        .into_iter()
        .map(|(category, (sum, count))| (category, sum / count as f64))
        .collect();

    tracing::debug!(
        members = members.len(),
        categories = aggregated.len(),
        "Family preferences aggregated"
    );

    Ok(aggregated)
}
