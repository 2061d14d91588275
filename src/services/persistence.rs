use serde_json::{Map, Value};
use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{
    error::{AppError, AppResult},
    models::RatingCategory,
    services::dataset::DELIMITER,
};

/// Descriptive columns accepted after the rating columns
pub const DESCRIPTIVE_COLUMNS: [&str; 7] = [
    "provincia",
    "canton",
    "parroquia",
    "nombre",
    "lat",
    "lon",
    "score (promedio preferencias)",
];

/// Every column a saved record may carry, in file order
pub fn known_columns() -> Vec<String> {
    RatingCategory::ALL
        .into_iter()
        .map(|c| c.label())
        .chain(DESCRIPTIVE_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// A record reduced to known columns, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

impl PreparedRecord {
    /// Keeps only known keys, ordered as in [`known_columns`]
    pub fn from_json(record: &Map<String, Value>) -> AppResult<Self> {
        if record.is_empty() {
            return Err(AppError::InvalidRequest(
                "No record information was provided".to_string(),
            ));
        }

        let (columns, values): (Vec<String>, Vec<String>) = known_columns()
            .into_iter()
            .filter_map(|column| {
                let value = record.get(&column).map(cell_text)?;
                Some((column, value))
            })
            .unzip();

        if columns.is_empty() {
            return Err(AppError::InvalidRequest(
                "Record has none of the known columns".to_string(),
            ));
        }

        let ignored = record.len() - columns.len();
        if ignored > 0 {
            tracing::debug!(ignored, "Dropped unknown record keys");
        }

        Ok(Self { columns, values })
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Append-only sink for family records used in later retraining
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Appends one record, returning the columns that were written
    async fn append(&self, record: PreparedRecord) -> AppResult<Vec<String>>;
}

/// Pipe-delimited file store; writes to one file never interleave
#[derive(Clone)]
pub struct CsvRecordStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the header on first use, then one data row per call
    pub fn append_blocking(&self, record: &PreparedRecord) -> AppResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::Internal("Record store lock poisoned".to_string()))?;

        // An empty file (touched, or left by a failed first write) still needs a header
        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        if !is_new {
            self.warn_on_column_drift(&record.columns)?;
        } else if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(file);

        if is_new {
            writer.write_record(&record.columns)?;
        }
        writer.write_record(&record.values)?;
        writer.flush()?;

        tracing::info!(
            path = %self.path.display(),
            columns = record.columns.len(),
            created = is_new,
            "Record appended"
        );
        Ok(())
    }

    /// The file keeps whatever columns each append carried; a header that
    /// differs from the new row is reported but not rejected
    fn warn_on_column_drift(&self, columns: &[String]) -> AppResult<()> {
        let mut header = String::new();
        BufReader::new(File::open(&self.path)?).read_line(&mut header)?;

        let existing: Vec<&str> = header
            .trim_end_matches(['\r', '\n'])
            .split(DELIMITER as char)
            .collect();
        if existing != columns {
            tracing::warn!(
                path = %self.path.display(),
                existing = existing.len(),
                incoming = columns.len(),
                "Record columns differ from the file header"
            );
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for CsvRecordStore {
    async fn append(&self, record: PreparedRecord) -> AppResult<Vec<String>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || -> AppResult<Vec<String>> {
            store.append_blocking(&record)?;
            Ok(record.columns)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
