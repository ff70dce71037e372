//! Integration tests for the file workflow: manifest → rename → import

use crm_migrator::cli::build_index;
use crm_migrator::client::FileAttacher;
use crm_migrator::config::{MigrationConfig, UploadConfig};
use crm_migrator::jobs::{self, RenameTarget};
use eyre::Result;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Records every call instead of talking to an API
#[derive(Default)]
struct RecordingAttacher {
    uploads: RefCell<Vec<PathBuf>>,
    attachments: RefCell<Vec<(String, String, String)>>,
}

impl FileAttacher for RecordingAttacher {
    async fn upload_file(&self, path: &Path, folder_path: &str) -> Result<String> {
        assert_eq!(folder_path, "/salesforce_import");
        let mut uploads = self.uploads.borrow_mut();
        uploads.push(path.to_path_buf());
        Ok(format!("{}", 9000 + uploads.len()))
    }

    async fn attach_file(
        &self,
        association_key: &str,
        object_id: &str,
        _file_id: &str,
        original_filename: &str,
    ) -> Result<()> {
        self.attachments.borrow_mut().push((
            association_key.to_string(),
            object_id.to_string(),
            original_filename.to_string(),
        ));
        Ok(())
    }
}

fn fixture() -> Result<(TempDir, MigrationConfig)> {
    let temp = TempDir::new()?;
    let root = temp.path();
    for dir in ["maps", "CSV", "Attachments", "ContentVersion", "out"] {
        fs::create_dir_all(root.join(dir))?;
    }

    fs::write(root.join("maps/company-mapper.csv"), "Record ID,SF ID\n111,001xx1\n")?;
    fs::write(root.join("maps/contact-mapper.csv"), "Record ID,SF ID\n301,003xx1\n")?;
    fs::write(root.join("maps/deal-mapper.csv"), "Record ID,SF ID\n601,006xx1\n")?;

    fs::write(
        root.join("CSV/Attachment.csv"),
        "Id,ParentId,Name,ContentType\n\
         00P1,006xx1,Contract.pdf,application/pdf\n\
         00P2,001xx1,logo,image/png\n\
         00P3,003xx1,missing.txt,text/plain\n",
    )?;
    fs::write(
        root.join("CSV/ContentVersion.csv"),
        "Id,ContentDocumentId,IsLatest,FileType,Title,PathOnClient\n\
         068B,069B,1,PDF,Proposal,proposal.pdf\n",
    )?;
    fs::write(
        root.join("CSV/ContentDocumentLink.csv"),
        "ContentDocumentId,LinkedEntityId\n069B,003xx1\n",
    )?;

    fs::write(root.join("Attachments/00P1"), b"%PDF-1.4")?;
    fs::write(root.join("Attachments/00P2"), b"\x89PNG\r\n\x1a\n")?;
    fs::write(root.join("ContentVersion/068B"), b"%PDF-1.7")?;

    let config = MigrationConfig {
        maps_dir: root.join("maps"),
        csv_dir: root.join("CSV"),
        attachments_dir: root.join("Attachments"),
        content_version_dir: root.join("ContentVersion"),
        output_dir: root.join("out"),
        upload: UploadConfig {
            api_delay_ms: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    Ok((temp, config))
}

fn prepare(config: &MigrationConfig) -> Result<()> {
    let index = build_index(config);
    jobs::build_manifest(config, &index)?;
    jobs::rename_files(config, RenameTarget::Attachments)?;
    jobs::rename_files(config, RenameTarget::ContentVersions)?;
    Ok(())
}

#[test]
fn test_rename_infers_extensions() -> Result<()> {
    let (_temp, config) = fixture()?;
    prepare(&config)?;

    assert!(config.attachments_dir.join("00P1 -- Contract.pdf").exists());
    // no extension in the name: the MIME type decides
    assert!(config.attachments_dir.join("00P2 -- logo.png").exists());
    assert!(config.content_version_dir.join("068B -- Proposal.pdf").exists());
    Ok(())
}

#[tokio::test]
async fn test_dry_run_touches_nothing() -> Result<()> {
    let (_temp, config) = fixture()?;
    prepare(&config)?;

    let summary =
        jobs::import_files::<RecordingAttacher>(&config.output_dir, &config.upload, None).await?;
    assert_eq!(summary.entries, 4);
    assert_eq!(summary.found, 3);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.uploaded, 0);
    Ok(())
}

#[tokio::test]
async fn test_import_uploads_and_attaches() -> Result<()> {
    let (_temp, config) = fixture()?;
    prepare(&config)?;
    let attacher = RecordingAttacher::default();

    let summary = jobs::import_files(&config.output_dir, &config.upload, Some(&attacher)).await?;
    assert_eq!(summary.uploaded, 3);
    assert_eq!(summary.attached, 3);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(
        attachments_sorted(&attacher),
        vec![
            ("companyIds".to_string(), "111".to_string(), "logo".to_string()),
            ("contactIds".to_string(), "301".to_string(), "Proposal".to_string()),
            ("dealIds".to_string(), "601".to_string(), "Contract.pdf".to_string()),
        ]
    );

    let uploads = attacher.uploads.borrow();
    assert!(uploads.iter().any(|p| p.ends_with("00P1 -- Contract.pdf")));
    Ok(())
}

fn attachments_sorted(attacher: &RecordingAttacher) -> Vec<(String, String, String)> {
    let mut attachments = attacher.attachments.borrow().clone();
    attachments.sort();
    attachments
}
