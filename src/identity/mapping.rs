//! Mapping table descriptors
//!
//! A mapping table is a destination export (e.g. HubSpot's company list)
//! that carries the original Salesforce identifier in one of a few possible
//! columns next to the new record ID.
//!
//! Example `migration.yml` fragment:
//! ```yaml
//! mappings:
//!   - table: contact-mapper.csv
//!     prefix: "003"
//!     candidate_columns: [SF ID, SF Contact ID]
//!   - table: contact-mapper.csv
//!     prefix: "00Q"
//!     candidate_columns: [SF Lead ID]
//! ```

use super::EntityPrefix;
use crate::storage::SourceRecord;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Column holding the destination identifier in every default mapper
pub const DEFAULT_DESTINATION_COLUMN: &str = "Record ID";

fn default_destination_column() -> String {
    DEFAULT_DESTINATION_COLUMN.to_string()
}

/// Describes how one mapping table feeds one prefix of the identity index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingSource {
    /// Table path, relative to the maps directory unless absolute
    pub table: PathBuf,

    /// Prefix whose sub-map this table populates
    pub prefix: EntityPrefix,

    /// Columns that may carry the source identifier, in priority order
    pub candidate_columns: Vec<String>,

    /// Column carrying the destination identifier
    #[serde(default = "default_destination_column")]
    pub destination_column: String,
}

impl MappingSource {
    pub fn new(table: impl Into<PathBuf>, prefix: EntityPrefix, candidate_columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            prefix,
            candidate_columns: candidate_columns.iter().map(|c| c.to_string()).collect(),
            destination_column: default_destination_column(),
        }
    }

    /// The mapper set every job uses unless configured otherwise
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("company-mapper.csv", EntityPrefix::Account, &["SF ID"]),
            Self::new(
                "contact-mapper.csv",
                EntityPrefix::Contact,
                &["SF ID", "SF Contact ID"],
            ),
            Self::new("contact-mapper.csv", EntityPrefix::Lead, &["SF Lead ID"]),
            Self::new("deal-mapper.csv", EntityPrefix::Opportunity, &["sf_id", "SF ID"]),
        ]
    }

    /// Source identifier of a mapper row: the first non-empty candidate column
    pub fn source_id<'r>(&self, row: &'r SourceRecord) -> Option<&'r str> {
        self.candidate_columns
            .iter()
            .find_map(|column| row.value(column))
    }

    /// Destination identifier of a mapper row
    pub fn destination_id<'r>(&self, row: &'r SourceRecord) -> Option<&'r str> {
        row.value(&self.destination_column)
    }
}
