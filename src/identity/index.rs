//! Prefix-keyed identity index

use super::{EntityPrefix, MappingSource};
use crate::storage::CsvSource;

use eyre::Result;
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::path::Path;

/// Source identifier → destination identifier, split by prefix
///
/// Built once per run from the mapping tables and read-only afterwards.
/// Within one prefix a source identifier maps to exactly one destination
/// identifier; a later insert for the same key replaces the earlier one.
///
/// # Example
/// ```
/// use crm_migrator::identity::{EntityPrefix, IdentityIndex};
///
/// let mut index = IdentityIndex::new();
/// index.insert(EntityPrefix::Account, "001xx1", "111");
///
/// assert_eq!(index.resolve(EntityPrefix::Account, "001xx1"), Some("111"));
/// assert_eq!(index.resolve(EntityPrefix::Contact, "001xx1"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    maps: HashMap<EntityPrefix, HashMap<String, String>>,
}

/// Outcome of loading one mapping table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLoad {
    /// Rows that produced a mapping
    pub loaded: usize,
    /// Rows that replaced an existing mapping with a different destination
    pub conflicts: usize,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from mapping tables
    ///
    /// Tables are resolved against `maps_dir`. A table that is missing or
    /// unreadable is logged and skipped; it never fails the run.
    pub fn load(sources: &[MappingSource], maps_dir: impl AsRef<Path>) -> Self {
        let maps_dir = maps_dir.as_ref();
        log::info!("Loading ID mapper files from {}", maps_dir.display().bright_black());

        let mut index = Self::new();
        for source in sources {
            match index.load_source(source, maps_dir) {
                Ok(load) => {
                    log::info!(
                        "Loaded {} mappings from {} for prefix {}",
                        load.loaded.cyan(),
                        source.table.display(),
                        source.prefix
                    );
                    if load.conflicts > 0 {
                        log::warn!(
                            "{} identifier(s) in {} were mapped to more than one record; the last row won",
                            load.conflicts,
                            source.table.display()
                        );
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Could not load {} for prefix {}: {}. Skipping.",
                        source.table.display(),
                        source.prefix,
                        e
                    );
                }
            }
        }
        index
    }

    /// Merge one mapping table into the index
    pub fn load_source(&mut self, source: &MappingSource, maps_dir: &Path) -> Result<SourceLoad> {
        let path = maps_dir.join(&source.table);
        let mut load = SourceLoad::default();

        for row in CsvSource::new(&path).open()? {
            let row = row?;
            let (Some(source_id), Some(destination_id)) =
                (source.source_id(&row), source.destination_id(&row))
            else {
                continue;
            };

            if let Some(previous) = self.insert(source.prefix, source_id, destination_id)
                && previous != destination_id
            {
                log::debug!(
                    "{} {} remapped from {} to {}",
                    source.prefix,
                    source_id,
                    previous,
                    destination_id
                );
                load.conflicts += 1;
            }
            load.loaded += 1;
        }

        Ok(load)
    }

    /// Insert a mapping, returning the destination it replaced
    pub fn insert(
        &mut self,
        prefix: EntityPrefix,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
    ) -> Option<String> {
        self.maps
            .entry(prefix)
            .or_default()
            .insert(source_id.into(), destination_id.into())
    }

    /// Destination identifier for a source identifier under a prefix
    pub fn resolve(&self, prefix: EntityPrefix, source_id: &str) -> Option<&str> {
        self.maps
            .get(&prefix)
            .and_then(|map| map.get(source_id))
            .map(String::as_str)
    }

    /// Number of mappings under a prefix
    pub fn len_of(&self, prefix: EntityPrefix) -> usize {
        self.maps.get(&prefix).map_or(0, HashMap::len)
    }

    /// Total number of mappings
    pub fn len(&self) -> usize {
        self.maps.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
