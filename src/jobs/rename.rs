//! Give exported files readable names and extensions

use crate::config::MigrationConfig;
use crate::files::{FileMetadata, FileRenamer, RenameSummary};
use crate::storage::{CsvSource, SourceRecord};

use eyre::Result;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which export folder to rename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenameTarget {
    Attachments,
    ContentVersions,
}

impl RenameTarget {
    fn table(&self) -> &'static str {
        match self {
            RenameTarget::Attachments => "Attachment.csv",
            RenameTarget::ContentVersions => "ContentVersion.csv",
        }
    }

    fn folder(&self, config: &MigrationConfig) -> PathBuf {
        match self {
            RenameTarget::Attachments => config.attachments_dir.clone(),
            RenameTarget::ContentVersions => config.content_version_dir.clone(),
        }
    }

    fn metadata(&self, row: &SourceRecord) -> Option<FileMetadata> {
        match self {
            RenameTarget::Attachments => FileMetadata::from_attachment(row),
            RenameTarget::ContentVersions => FileMetadata::from_content_version(row),
        }
    }
}

/// Read the file metadata of a target from its table
///
/// Unreadable rows are skipped with a warning.
pub fn load_metadata(target: RenameTarget, table: &Path) -> Result<Vec<FileMetadata>> {
    let mut metadata = Vec::new();
    for (i, row) in CsvSource::new(table).open()?.enumerate() {
        match row {
            Ok(row) => metadata.extend(target.metadata(&row)),
            Err(e) => log::warn!("Skipping unreadable row #{} of {}: {}", i + 1, table.display(), e),
        }
    }
    Ok(metadata)
}

/// Rename the files of an export folder to `{Id} -- {name}.{ext}`
pub fn rename_files(config: &MigrationConfig, target: RenameTarget) -> Result<RenameSummary> {
    let table = config.csv_path(target.table());
    log::info!("Reading file metadata from {}", table.display().bright_black());
    let metadata = load_metadata(target, &table)?;

    let renamer = FileRenamer::new(target.folder(config), metadata, config.max_filename_length)?;
    let summary = renamer.rename_all()?;
    log::info!("Rename complete: {}", summary);
    Ok(summary)
}
