//! Migration configuration
//!
//! Every setting has a default matching the usual export layout, so the
//! `migration.yml` file is optional and only needs the keys that differ:
//!
//! ```yaml
//! csv_dir: ../export/CSV
//! max_chunk_bytes: 104857600
//! activity_types:
//!   calls: [Call, Qual Call, Cold Call]
//! upload:
//!   dry_run: false
//! ```

use crate::export::DEFAULT_MAX_CHUNK_BYTES;
use crate::identity::MappingSource;
use crate::jobs::Engagement;

use eyre::{Context, Result};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "migration.yml";

/// Settings shared by every job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    /// Directory holding the destination mapper exports
    pub maps_dir: PathBuf,
    /// Directory holding the source CSV tables
    pub csv_dir: PathBuf,
    /// Directory holding exported attachment bodies
    pub attachments_dir: PathBuf,
    /// Directory holding exported content-version bodies
    pub content_version_dir: PathBuf,
    /// Where import files are written
    pub output_dir: PathBuf,
    /// Byte budget of one chunk file, header included
    pub max_chunk_bytes: u64,
    /// Drop rows whose body column ends up empty
    pub skip_rows_with_empty_body: bool,
    /// Mapping tables feeding the identity index
    pub mappings: Vec<MappingSource>,
    pub activity_types: ActivityTypes,
    /// Length limit of the readable part of renamed files
    pub max_filename_length: usize,
    pub upload: UploadConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            maps_dir: PathBuf::from("./maps"),
            csv_dir: PathBuf::from("../CSV"),
            attachments_dir: PathBuf::from("../Attachments"),
            content_version_dir: PathBuf::from("../ContentVersion"),
            output_dir: PathBuf::from("./"),
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            skip_rows_with_empty_body: true,
            mappings: MappingSource::defaults(),
            activity_types: ActivityTypes::default(),
            max_filename_length: 200,
            upload: UploadConfig::default(),
        }
    }
}

impl MigrationConfig {
    /// Read a config file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        // an empty file is a valid "all defaults" config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML: {}", path.display()))
    }

    /// Read a config file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            log::debug!("Loading configuration from {}", path.display());
            Self::read(path)
        } else {
            log::info!(
                "No config file at {}, using defaults",
                path.display().bright_black()
            );
            Ok(Self::default())
        }
    }

    /// Path of a source table in the CSV directory
    pub fn csv_path(&self, table: &str) -> PathBuf {
        self.csv_dir.join(table)
    }
}

/// Source activity `Type` values per engagement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActivityTypes {
    pub calls: Vec<String>,
    pub meetings: Vec<String>,
    pub emails: Vec<String>,
}

impl Default for ActivityTypes {
    fn default() -> Self {
        Self {
            calls: vec!["Call".to_string(), "Qual Call".to_string()],
            meetings: vec!["Meeting".to_string(), "Demo".to_string()],
            emails: vec!["Email".to_string()],
        }
    }
}

impl ActivityTypes {
    /// Engagement a source activity type migrates to, if any
    pub fn engagement(&self, activity_type: &str) -> Option<Engagement> {
        let activity_type = activity_type.trim();
        Engagement::ALL.into_iter().find(|engagement| {
            self.types(*engagement)
                .iter()
                .any(|t| t.as_str() == activity_type)
        })
    }

    pub fn types(&self, engagement: Engagement) -> &[String] {
        match engagement {
            Engagement::Calls => &self.calls,
            Engagement::Meetings => &self.meetings,
            Engagement::Emails => &self.emails,
        }
    }
}

/// File upload settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Only report what would be uploaded
    pub dry_run: bool,
    /// Pause between manifest entries
    pub api_delay_ms: u64,
    /// File manager folder uploads land in
    pub folder_path: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            api_delay_ms: 200,
            folder_path: "/salesforce_import".to_string(),
        }
    }
}
