//! CSV source tables
//!
//! Salesforce exports are header-rowed CSV files. [`CsvSource`] opens one and
//! yields a [`SourceRecord`] per data row without reading the whole file.

use crate::etl::Extractor;

use eyre::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    fn push(&mut self, name: &str) -> usize {
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }
}

/// A row of named fields from a source table
///
/// The column index is shared between every row of one table.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    columns: Arc<Columns>,
    values: Vec<String>,
}

impl SourceRecord {
    /// Build a record from `(column, value)` pairs
    ///
    /// # Example
    /// ```
    /// use crm_migrator::storage::SourceRecord;
    ///
    /// let record = SourceRecord::from_pairs([("Id", "00T1"), ("WhoId", "")]);
    /// assert_eq!(record.get("Id"), Some("00T1"));
    /// assert_eq!(record.get("WhoId"), Some(""));
    /// assert_eq!(record.value("WhoId"), None);
    /// assert_eq!(record.get("Missing"), None);
    /// ```
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: Arc::new(Columns::new(names)),
            values,
        }
    }

    /// Raw value of a column; `None` when the column is absent from the row
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .index
            .get(column)
            .and_then(|&i| self.values.get(i))
            .map(String::as_str)
    }

    /// Value of a column, treating an empty string as absent
    pub fn value(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    /// Set a column, adding it when the table does not have it
    pub fn with_field(mut self, column: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.columns.index.get(column).copied() {
            Some(i) if i < self.values.len() => self.values[i] = value,
            Some(i) => {
                self.values.resize(i, String::new());
                self.values.push(value);
            }
            None => {
                let i = Arc::make_mut(&mut self.columns).push(column);
                self.values.resize(i, String::new());
                self.values.push(value);
            }
        }
        self
    }

    /// Column names in table order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.names.iter().map(String::as_str)
    }
}

/// A header-rowed CSV file
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and read its header row
    pub fn open(&self) -> Result<SourceRowStream> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header: {}", self.path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        Ok(SourceRowStream {
            columns: Arc::new(Columns::new(headers)),
            records: reader.into_records(),
            path: self.path.clone(),
        })
    }
}

impl Extractor for CsvSource {
    type Item = SourceRecord;
    type Stream = SourceRowStream;

    fn extract(&self) -> Result<Self::Stream> {
        log::debug!("Streaming rows from {}", self.path.display());
        self.open()
    }
}

/// Lazy stream of rows from a [`CsvSource`]
pub struct SourceRowStream {
    columns: Arc<Columns>,
    records: csv::StringRecordsIntoIter<File>,
    path: PathBuf,
}

impl Iterator for SourceRowStream {
    type Item = Result<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(
            record
                .with_context(|| format!("Failed to parse row in {}", self.path.display()))
                .map(|record| SourceRecord {
                    columns: Arc::clone(&self.columns),
                    values: record.iter().map(str::to_string).collect(),
                }),
        )
    }
}
