//! Upload renamed files and attach them to their records

use super::file_manifest::{MANIFEST_DATASET, ManifestEntry};
use crate::client::FileAttacher;
use crate::config::UploadConfig;
use crate::etl::Extractor;
use crate::files::{find_by_id, list_files};
use crate::storage::NdjsonReader;

use eyre::Result;
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Manifest entries read
    pub entries: usize,
    /// Entries whose renamed file was found on disk
    pub found: usize,
    pub missing: usize,
    pub uploaded: usize,
    pub attached: usize,
    /// Uploads or attachments the API rejected
    pub failed: usize,
    /// Unreadable entries and entries without an attachable object type
    pub skipped: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entries {}, found {}, missing {}, uploaded {}, attached {}, failed {}, skipped {}",
            self.entries,
            self.found,
            self.missing,
            self.uploaded,
            self.attached,
            self.failed,
            self.skipped
        )
    }
}

/// Manifest partitions in a directory, e.g. `files_manifest_deals_chunk1.json`
pub fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_", MANIFEST_DATASET);
    Ok(list_files(dir)?
        .into_iter()
        .filter(|name| {
            name.starts_with(&prefix) && name.contains("_chunk") && name.ends_with(".json")
        })
        .map(|name| dir.join(name))
        .collect())
}

/// Directory listings, read once per file location
#[derive(Default)]
struct Listings {
    cache: HashMap<String, Vec<String>>,
}

impl Listings {
    fn get(&mut self, location: &str) -> &[String] {
        self.cache.entry(location.to_string()).or_insert_with(|| {
            list_files(Path::new(location)).unwrap_or_else(|e| {
                log::error!("Could not list {}: {}", location, e);
                Vec::new()
            })
        })
    }
}

/// Upload every manifest entry's file and attach it to its record
///
/// Without an attacher this is a dry run: files are looked up and reported
/// but nothing is sent.
pub async fn import_files<A: FileAttacher>(
    manifest_dir: &Path,
    upload: &UploadConfig,
    attacher: Option<&A>,
) -> Result<ImportSummary> {
    let manifests = manifest_files(manifest_dir)?;
    if manifests.is_empty() {
        log::warn!(
            "No manifest files found in {}",
            manifest_dir.display().bright_black()
        );
    }
    if attacher.is_none() {
        log::info!("{} no files will be uploaded or attached", "DRY RUN:".yellow());
    }

    let delay = Duration::from_millis(upload.api_delay_ms);
    let mut listings = Listings::default();
    let mut summary = ImportSummary::default();

    for manifest in &manifests {
        log::info!("Processing {}", manifest.display().bright_black());
        for entry in NdjsonReader::<ManifestEntry>::new(manifest).extract()? {
            summary.entries += 1;
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable manifest entry: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };
            let Some(association_key) = entry.object_type().and_then(|t| t.association_key())
            else {
                log::warn!(
                    "Skipping [{}]: files cannot be attached to '{}'",
                    entry.source_file_id,
                    entry.object_type
                );
                summary.skipped += 1;
                continue;
            };

            let Some(file_name) =
                find_by_id(listings.get(&entry.file_location), &entry.source_file_id)
            else {
                log::warn!(
                    "Could not find a renamed file for [{}] in {}",
                    entry.source_file_id,
                    entry.file_location
                );
                summary.missing += 1;
                continue;
            };
            let path = Path::new(&entry.file_location).join(file_name);
            summary.found += 1;

            match attacher {
                None => log::info!(
                    "[dry run] would upload {} and attach it to {} {}",
                    file_name.cyan(),
                    entry.object_type,
                    entry.destination_id
                ),
                Some(attacher) => {
                    attach(attacher, association_key, &entry, &path, upload, &mut summary).await
                }
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    log::info!("Import complete: {}", summary);
    Ok(summary)
}

async fn attach<A: FileAttacher>(
    attacher: &A,
    association_key: &str,
    entry: &ManifestEntry,
    path: &Path,
    upload: &UploadConfig,
    summary: &mut ImportSummary,
) {
    let file_id = match attacher.upload_file(path, &upload.folder_path).await {
        Ok(id) => id,
        Err(e) => {
            log::error!("Failed to upload {}: {}", path.display(), e);
            summary.failed += 1;
            return;
        }
    };
    summary.uploaded += 1;
    log::debug!("Uploaded {} as file {}", path.display(), file_id);

    match attacher
        .attach_file(
            association_key,
            &entry.destination_id,
            &file_id,
            &entry.original_filename,
        )
        .await
    {
        Ok(()) => {
            summary.attached += 1;
            log::info!(
                "Attached {} to {} {}",
                entry.original_filename.cyan(),
                entry.object_type,
                entry.destination_id
            );
        }
        Err(e) => {
            log::error!(
                "Failed to attach file {} to {}: {}",
                file_id,
                entry.destination_id,
                e
            );
            summary.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::bail;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        uploads: RefCell<Vec<PathBuf>>,
        attachments: RefCell<Vec<(String, String, String)>>,
        reject: Option<&'static str>,
    }

    impl FileAttacher for Recorder {
        async fn upload_file(&self, path: &Path, _folder_path: &str) -> Result<String> {
            if let Some(reject) = self.reject
                && path.to_string_lossy().contains(reject)
            {
                bail!("413 Payload Too Large");
            }
            let mut uploads = self.uploads.borrow_mut();
            uploads.push(path.to_path_buf());
            Ok(format!("f{}", uploads.len()))
        }

        async fn attach_file(
            &self,
            association_key: &str,
            object_id: &str,
            file_id: &str,
            _original_filename: &str,
        ) -> Result<()> {
            self.attachments.borrow_mut().push((
                association_key.to_string(),
                object_id.to_string(),
                file_id.to_string(),
            ));
            Ok(())
        }
    }

    fn setup() -> (TempDir, UploadConfig) {
        let temp = TempDir::new().unwrap();
        let files = temp.path().join("Attachments");
        std::fs::create_dir_all(&files).unwrap();
        std::fs::write(files.join("00P1 -- Contract.pdf"), b"%PDF").unwrap();
        std::fs::write(files.join("00P2 -- Photo.png"), b"png").unwrap();

        let location = files.to_string_lossy().to_string();
        let line = |object_type: &str, id: &str, file: &str| {
            serde_json::to_string(&ManifestEntry {
                object_type: object_type.to_string(),
                destination_id: id.to_string(),
                source_parent_id: "sf".to_string(),
                source_file_id: file.to_string(),
                file_location: location.clone(),
                original_filename: format!("{}.bin", file),
            })
            .unwrap()
        };
        std::fs::write(
            temp.path().join("files_manifest_deals_chunk1.json"),
            format!("{}\n{}\n", line("deals", "601", "00P1"), line("deals", "602", "00P3")),
        )
        .unwrap();
        std::fs::write(
            temp.path().join("files_manifest_contacts_chunk1.json"),
            format!("{}\nnot json\n", line("contacts", "301", "00P2")),
        )
        .unwrap();
        std::fs::write(temp.path().join("hubspot_import_calls_contacts_chunk1.csv"), "x").unwrap();

        let upload = UploadConfig {
            api_delay_ms: 0,
            ..Default::default()
        };
        (temp, upload)
    }

    #[test]
    fn test_manifest_files() {
        let (temp, _) = setup();
        let names: Vec<_> = manifest_files(temp.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "files_manifest_contacts_chunk1.json",
                "files_manifest_deals_chunk1.json"
            ]
        );
    }

    #[tokio::test]
    async fn test_dry_run() {
        let (temp, upload) = setup();
        let summary = import_files::<Recorder>(temp.path(), &upload, None)
            .await
            .unwrap();
        assert_eq!(summary.entries, 4);
        assert_eq!(summary.found, 2);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.uploaded, 0);
    }

    #[tokio::test]
    async fn test_upload_and_attach() {
        let (temp, upload) = setup();
        let recorder = Recorder::default();

        let summary = import_files(temp.path(), &upload, Some(&recorder))
            .await
            .unwrap();
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.attached, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            recorder.attachments.borrow().clone(),
            vec![
                ("contactIds".to_string(), "301".to_string(), "f1".to_string()),
                ("dealIds".to_string(), "601".to_string(), "f2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_upload_counted() {
        let (temp, upload) = setup();
        let recorder = Recorder {
            reject: Some("Photo"),
            ..Default::default()
        };

        let summary = import_files(temp.path(), &upload, Some(&recorder))
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.attached, 1);
    }
}
