use std::{collections::HashMap, fs::File, io::Read, path::Path};

use crate::{
    error::{AppError, AppResult},
    models::{FeatureVector, RatingCategory, ReviewRow, TrainingRecord},
};

/// Field separator of the dataset and record files
pub const DELIMITER: u8 = b'|';

/// Label column required for training
pub const SCORE_COLUMN: &str = "score";

/// Historical reviews loaded from a pipe-delimited file
#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    rows: Vec<ReviewRow>,
    has_score: bool,
}

impl HistoricalDataset {
    /// Loads the dataset at `path`, failing with `DataUnavailable` when it is absent
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AppError::DataUnavailable(format!("Cannot open dataset {}: {}", path.display(), e))
        })?;

        let dataset = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            rows = dataset.rows.len(),
            has_score = dataset.has_score,
            "Historical dataset loaded"
        );
        Ok(dataset)
    }

    /// Parses a pipe-delimited dataset with a header row
    ///
    /// Rating columns missing from the header read as 0.0, as do cells that
    /// do not parse as numbers.
    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .flexible(true)
            .from_reader(reader);

        let columns: HashMap<String, usize> = csv_reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, name)| (normalize_header(name), i))
            .collect();

        let category_columns: Vec<(RatingCategory, Option<usize>)> = RatingCategory::ALL
            .into_iter()
            .map(|c| (c, columns.get(&c.label()).copied()))
            .collect();

        let missing_categories: Vec<RatingCategory> = category_columns
            .iter()
            .filter(|(_, index)| index.is_none())
            .map(|(c, _)| *c)
            .collect();
        if !missing_categories.is_empty() {
            tracing::warn!(
                missing = ?missing_categories,
                "Dataset lacks some rating columns, filling with 0.0"
            );
        }

        let score_column = columns.get(SCORE_COLUMN).copied();
        let text = |record: &csv::StringRecord, name: &str| -> String {
            columns
                .get(name)
                .and_then(|&i| record.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let number = |record: &csv::StringRecord, name: &str| -> Option<f64> {
            columns
                .get(name)
                .and_then(|&i| record.get(i))
                .and_then(parse_number)
        };

        let mut rows = Vec::new();
        for (line, result) in csv_reader.records().enumerate() {
            let record = result?;

            let mut ratings = FeatureVector::zeros();
            for (category, index) in &category_columns {
                let value = index
                    .and_then(|i| record.get(i))
                    .and_then(parse_number)
                    .unwrap_or(0.0);
                ratings.set(*category, value);
            }

            let score = match score_column.map(|i| record.get(i).and_then(parse_number)) {
                Some(Some(score)) => Some(score),
                Some(None) => {
                    tracing::warn!(line = line + 2, "Row has an unparsable score");
                    None
                }
                None => None,
            };

            rows.push(ReviewRow {
                name: text(&record, "nombre"),
                province: text(&record, "provincia"),
                canton: text(&record, "canton"),
                parish: text(&record, "parroquia"),
                lat: number(&record, "lat"),
                lon: number(&record, "lon"),
                ratings,
                score,
            });
        }

        Ok(Self {
            rows,
            has_score: score_column.is_some(),
        })
    }

    pub fn rows(&self) -> &[ReviewRow] {
        &self.rows
    }

    pub fn has_score(&self) -> bool {
        self.has_score
    }

    /// Rows usable as supervised training examples
    ///
    /// Fails when the label column is absent; rows with an unparsable score
    /// are skipped.
    pub fn training_records(&self) -> AppResult<Vec<TrainingRecord>> {
        if !self.has_score {
            return Err(AppError::DataUnavailable(format!(
                "Dataset is missing the '{}' column",
                SCORE_COLUMN
            )));
        }

        Ok(self
            .rows
            .iter()
            .filter_map(|row| {
                row.score.map(|score| TrainingRecord {
                    features: row.ratings,
                    score,
                })
            })
            .collect())
    }
}

/// Strips a UTF-8 byte order mark and surrounding whitespace
fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_string()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\u{feff}ID unico de usuario|Calif promedio playas|Calif promedio museos|provincia|canton|parroquia|nombre|lat|lon|score\n\
        1|4.5|2|Santa Elena|Santa Elena|Manglaralto|Montañita|-1.82|-80.75|3.25\n\
        2|n/a|3|Cotopaxi|Pujilí|Zumbahua|Quilotoa|-0.86|-78.9|abc\n";

    #[test]
    fn test_parses_rows_and_fills_missing_columns() {
        let dataset = HistoricalDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.rows().len(), 2);
        assert!(dataset.has_score());

        let first = &dataset.rows()[0];
        assert_eq!(first.name, "Montañita");
        assert_eq!(first.province, "Santa Elena");
        assert_eq!(first.parish, "Manglaralto");
        assert_eq!(first.ratings[RatingCategory::Playas], 4.5);
        assert_eq!(first.ratings[RatingCategory::Museos], 2.0);
        assert_eq!(first.ratings[RatingCategory::Jardines], 0.0);
        assert_eq!(first.lat, Some(-1.82));
        assert_eq!(first.score, Some(3.25));

        let second = &dataset.rows()[1];
        assert_eq!(second.ratings[RatingCategory::Playas], 0.0);
        assert_eq!(second.score, None);
    }

    #[test]
    fn test_training_records_skip_bad_scores() {
        let dataset = HistoricalDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let records = dataset.training_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 3.25);
    }

    #[test]
    fn test_missing_score_column_is_unavailable() {
        let data = "Calif promedio playas|nombre\n4|Montañita\n";
        let dataset = HistoricalDataset::from_reader(data.as_bytes()).unwrap();
        assert!(!dataset.has_score());
        assert!(matches!(
            dataset.training_records(),
            Err(AppError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = HistoricalDataset::load("/definitely/not/here.csv");
        assert!(matches!(result, Err(AppError::DataUnavailable(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let dataset = HistoricalDataset::load(file.path()).unwrap();
        assert_eq!(dataset.rows().len(), 2);
    }
}
