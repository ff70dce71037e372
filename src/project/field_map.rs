//! Destination column definitions

use super::timestamp::{end_time, format_iso, parse_minutes, parse_timestamp};
use crate::resolve::Association;
use crate::storage::SourceRecord;

use std::collections::HashMap;

/// Side table keyed by a source column (e.g. email bodies by task id)
pub type LookupTable = HashMap<String, String>;

/// How one destination column gets its value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExpr {
    /// Copy a source column
    Column(String),
    /// First non-empty of several source columns
    FirstOf(Vec<String>),
    /// Fixed text
    Constant(String),
    /// The resolved destination identifier
    AssociationId,
    /// The resolved destination object type (`contacts`, `companies`, ...)
    ObjectType,
    /// Value from a named lookup table keyed by a source column, else the
    /// fallback
    Lookup {
        table: String,
        key_column: String,
        fallback: Box<FieldExpr>,
    },
    /// `prefix + value + suffix` when the inner value is non-empty, else empty
    Decorated {
        expr: Box<FieldExpr>,
        prefix: String,
        suffix: String,
    },
    /// Inner values joined back to back
    Concat(Vec<FieldExpr>),
    /// Inner value normalised to ISO-8601 UTC
    Timestamp(Box<FieldExpr>),
    /// Inner start time plus a minutes column, as ISO-8601 UTC
    EndTime {
        start: Box<FieldExpr>,
        minutes_column: String,
    },
}

impl FieldExpr {
    pub fn column(name: &str) -> Self {
        FieldExpr::Column(name.to_string())
    }

    pub fn first_of(names: &[&str]) -> Self {
        FieldExpr::FirstOf(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn constant(value: &str) -> Self {
        FieldExpr::Constant(value.to_string())
    }

    pub fn lookup(table: &str, key_column: &str, fallback: FieldExpr) -> Self {
        FieldExpr::Lookup {
            table: table.to_string(),
            key_column: key_column.to_string(),
            fallback: Box::new(fallback),
        }
    }

    pub fn decorated(expr: FieldExpr, prefix: &str, suffix: &str) -> Self {
        FieldExpr::Decorated {
            expr: Box::new(expr),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    pub fn timestamp(expr: FieldExpr) -> Self {
        FieldExpr::Timestamp(Box::new(expr))
    }

    pub fn end_time(start: FieldExpr, minutes_column: &str) -> Self {
        FieldExpr::EndTime {
            start: Box::new(start),
            minutes_column: minutes_column.to_string(),
        }
    }

    /// Evaluate against a record and its association; absent values are empty
    pub fn evaluate(
        &self,
        record: &SourceRecord,
        association: &Association,
        lookups: &HashMap<String, LookupTable>,
    ) -> String {
        match self {
            FieldExpr::Column(name) => record.get(name).unwrap_or_default().to_string(),
            FieldExpr::FirstOf(names) => names
                .iter()
                .find_map(|name| record.value(name))
                .unwrap_or_default()
                .to_string(),
            FieldExpr::Constant(value) => value.clone(),
            FieldExpr::AssociationId => association.destination_id.clone(),
            FieldExpr::ObjectType => association.object_type.partition_name().to_string(),
            FieldExpr::Lookup {
                table,
                key_column,
                fallback,
            } => record
                .value(key_column)
                .and_then(|key| lookups.get(table)?.get(key))
                .filter(|value| !value.is_empty())
                .cloned()
                .unwrap_or_else(|| fallback.evaluate(record, association, lookups)),
            FieldExpr::Decorated {
                expr,
                prefix,
                suffix,
            } => {
                let value = expr.evaluate(record, association, lookups);
                if value.is_empty() {
                    value
                } else {
                    format!("{}{}{}", prefix, value, suffix)
                }
            }
            FieldExpr::Concat(parts) => parts
                .iter()
                .map(|part| part.evaluate(record, association, lookups))
                .collect(),
            FieldExpr::Timestamp(expr) => {
                let value = expr.evaluate(record, association, lookups);
                match parse_timestamp(&value) {
                    Some(dt) => format_iso(dt),
                    None => {
                        if !value.is_empty() {
                            log::debug!("Unparsable timestamp '{}'", value);
                        }
                        String::new()
                    }
                }
            }
            FieldExpr::EndTime {
                start,
                minutes_column,
            } => {
                let start = start.evaluate(record, association, lookups);
                let minutes = parse_minutes(record.get(minutes_column).unwrap_or_default());
                parse_timestamp(&start)
                    .and_then(|dt| end_time(dt, minutes))
                    .map(format_iso)
                    .unwrap_or_default()
            }
        }
    }
}

/// Ordered destination schema: column name → expression
///
/// # Example
/// ```
/// use crm_migrator::project::{FieldExpr, FieldMap};
///
/// let map = FieldMap::new()
///     .column("Record ID", FieldExpr::AssociationId)
///     .column("Note Body", FieldExpr::column("Body"));
/// assert_eq!(map.headers(), vec!["Record ID", "Note Body"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    columns: Vec<(String, FieldExpr)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a destination column
    pub fn column(mut self, name: &str, expr: FieldExpr) -> Self {
        self.columns.push((name.to_string(), expr));
        self
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldExpr)> {
        self.columns.iter().map(|(name, expr)| (name.as_str(), expr))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
