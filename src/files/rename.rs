//! Renaming exported files to `{Id} -- {name}.{ext}`

use super::infer_extension;
use crate::storage::SourceRecord;

use eyre::{Context, Result, bail};
use owo_colors::OwoColorize;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separates the record id from the readable name
pub const MARKER: &str = " -- ";

const UNSAFE_CHARS: &str = r#"[<>:"/\\|?*]"#;

/// Builds readable file names that every file system accepts
#[derive(Debug, Clone)]
pub struct NameSanitizer {
    unsafe_chars: Regex,
    max_len: usize,
}

impl NameSanitizer {
    /// `max_len` bounds the readable part, in characters
    pub fn new(max_len: usize) -> Result<Self> {
        let unsafe_chars = Regex::new(UNSAFE_CHARS)
            .with_context(|| format!("Invalid file name pattern: {}", UNSAFE_CHARS))?;
        Ok(Self {
            unsafe_chars,
            max_len,
        })
    }

    /// Replace characters file systems reject with `_`
    pub fn sanitize(&self, name: &str) -> String {
        self.unsafe_chars.replace_all(name, "_").into_owned()
    }

    /// `{id} -- {sanitized name}.{extension}`
    ///
    /// The extension of `name` itself is dropped and the rest cut to the
    /// length limit.
    pub fn file_name(&self, id: &str, name: &str, extension: &str) -> String {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);
        let body: String = self.sanitize(stem).chars().take(self.max_len).collect();
        format!("{}{}{}.{}", id, MARKER, body, extension)
    }
}

/// What the export says about one stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub id: String,
    /// Human readable name; its extension, if any, is dropped
    pub name: String,
    /// File name the extension is taken from
    pub declared_filename: Option<String>,
    pub content_type: Option<String>,
}

impl FileMetadata {
    /// Attachment.csv row: `Id`, `Name`, `ContentType`
    pub fn from_attachment(row: &SourceRecord) -> Option<Self> {
        let id = row.value("Id")?.trim();
        let name = row.value("Name")?;
        Some(Self {
            id: id.to_string(),
            name: name.to_string(),
            declared_filename: Some(name.to_string()),
            content_type: row.value("ContentType").map(str::to_string),
        })
    }

    /// Latest, non-SNOTE ContentVersion.csv row: `Id`, `Title`, `PathOnClient`
    pub fn from_content_version(row: &SourceRecord) -> Option<Self> {
        if row.get("IsLatest") != Some("1") || row.get("FileType") == Some("SNOTE") {
            return None;
        }
        let id = row.value("Id")?.trim();
        Some(Self {
            id: id.to_string(),
            name: row.get("Title").unwrap_or_default().to_string(),
            declared_filename: row.value("PathOnClient").map(str::to_string),
            content_type: None,
        })
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed(PathBuf),
    /// Already carries the marker
    AlreadyProcessed,
    /// No metadata for this id
    Unknown,
    NoExtension,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: usize,
    pub skipped_processed: usize,
    pub skipped_unknown: usize,
    pub skipped_no_extension: usize,
    pub failed: usize,
}

impl RenameSummary {
    fn record(&mut self, outcome: &RenameOutcome) {
        match outcome {
            RenameOutcome::Renamed(_) => self.renamed += 1,
            RenameOutcome::AlreadyProcessed => self.skipped_processed += 1,
            RenameOutcome::Unknown => self.skipped_unknown += 1,
            RenameOutcome::NoExtension => self.skipped_no_extension += 1,
            RenameOutcome::Failed => self.failed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_processed + self.skipped_unknown + self.skipped_no_extension
    }
}

impl fmt::Display for RenameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "renamed {}, skipped {} (already processed {}, unknown {}, no extension {}), failed {}",
            self.renamed,
            self.skipped(),
            self.skipped_processed,
            self.skipped_unknown,
            self.skipped_no_extension,
            self.failed
        )
    }
}

/// Renames the files of one export folder
pub struct FileRenamer {
    dir: PathBuf,
    metadata: HashMap<String, FileMetadata>,
    names: NameSanitizer,
}

impl FileRenamer {
    /// Fails when there is no metadata at all: renaming against an empty
    /// table would only skip every file
    pub fn new(
        dir: impl AsRef<Path>,
        metadata: impl IntoIterator<Item = FileMetadata>,
        max_name_len: usize,
    ) -> Result<Self> {
        let metadata: HashMap<String, FileMetadata> = metadata
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
        if metadata.is_empty() {
            bail!("No file metadata was loaded; nothing to rename");
        }
        log::info!("Loaded metadata for {} file(s)", metadata.len().cyan());

        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            metadata,
            names: NameSanitizer::new(max_name_len)?,
        })
    }

    /// Rename one file of the folder
    pub fn rename(&self, file_name: &str) -> RenameOutcome {
        if file_name.contains(MARKER) {
            return RenameOutcome::AlreadyProcessed;
        }

        let id = file_name.trim();
        let Some(meta) = self.metadata.get(id) else {
            log::debug!("No metadata for {}", file_name);
            return RenameOutcome::Unknown;
        };

        let source = self.dir.join(file_name);
        let Some(extension) = infer_extension(
            meta.declared_filename.as_deref(),
            meta.content_type.as_deref(),
            &source,
        ) else {
            log::warn!(
                "Skipping [{}]: could not determine an extension from any source",
                id
            );
            return RenameOutcome::NoExtension;
        };

        let target = self
            .dir
            .join(self.names.file_name(id, &meta.name, &extension));
        match std::fs::rename(&source, &target) {
            Ok(()) => {
                log::debug!("{} → {}", file_name, target.display());
                RenameOutcome::Renamed(target)
            }
            Err(e) => {
                log::error!("Error renaming '{}': {}", file_name, e);
                RenameOutcome::Failed
            }
        }
    }

    /// Rename every file of the folder
    pub fn rename_all(&self) -> Result<RenameSummary> {
        let files = super::list_files(&self.dir)?;
        log::info!(
            "Found {} file(s) in {}",
            files.len().cyan(),
            self.dir.display().bright_black()
        );

        let mut summary = RenameSummary::default();
        for file_name in &files {
            summary.record(&self.rename(file_name));
        }
        Ok(summary)
    }
}
