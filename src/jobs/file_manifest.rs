//! Upload manifest for attachments and content-version files
//!
//! One JSON entry per (file, resolved parent record):
//!
//! ```json
//! {"object_type":"deals","destination_id":"601","source_parent_id":"006xx1","source_file_id":"00P1","file_location":"../Attachments","original_filename":"Contract.pdf"}
//! ```

use super::tables::{self, LinkPolicy};
use super::{JobReport, RecordMigration};
use crate::config::MigrationConfig;
use crate::etl::{Pipeline, Transformer};
use crate::export::{ExportFormat, PartitionedExporter};
use crate::identity::{EntityPrefix, IdentityIndex, ObjectType};
use crate::project::{FieldExpr, FieldMap, LookupTable, ProjectedRow, RowProjector};
use crate::resolve::{AssociationResolver, ReferenceField};
use crate::storage::{CsvSource, SourceRecord};

use eyre::Result;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MANIFEST_DATASET: &str = "files_manifest";

const PARENT: &str = "ParentId";

/// One file to upload and attach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Partition name: `contacts`, `companies` or `deals`
    pub object_type: String,
    pub destination_id: String,
    pub source_parent_id: String,
    pub source_file_id: String,
    /// Folder holding the renamed file
    pub file_location: String,
    pub original_filename: String,
}

impl ManifestEntry {
    pub fn object_type(&self) -> Option<ObjectType> {
        ObjectType::from_partition_name(&self.object_type)
    }
}

/// Files can only be attached to people, organizations and deals
fn parent_field() -> ReferenceField {
    ReferenceField::new(
        PARENT,
        &[
            EntityPrefix::Account,
            EntityPrefix::Contact,
            EntityPrefix::Lead,
            EntityPrefix::Opportunity,
        ],
    )
}

fn manifest_fields(file_location: &Path, filename_column: &str) -> FieldMap {
    let location = file_location.to_string_lossy().replace('\\', "/");
    FieldMap::new()
        .column("object_type", FieldExpr::ObjectType)
        .column("destination_id", FieldExpr::AssociationId)
        .column("source_parent_id", FieldExpr::column(PARENT))
        .column("source_file_id", FieldExpr::column("Id"))
        .column("file_location", FieldExpr::constant(&location))
        .column("original_filename", FieldExpr::column(filename_column))
}

/// Attachment.csv rows: `Id`, `ParentId`, `Name`
pub fn attachment_migration<'a>(
    index: &'a IdentityIndex,
    attachments_dir: &Path,
) -> RecordMigration<'a> {
    RecordMigration::new(
        AssociationResolver::new(index, vec![parent_field()]),
        RowProjector::new(manifest_fields(attachments_dir, "Name")),
    )
}

/// Latest, non-SNOTE ContentVersion.csv rows, parented through their
/// document link
pub struct ContentVersionMigration<'a> {
    inner: RecordMigration<'a>,
    links: LookupTable,
}

impl<'a> ContentVersionMigration<'a> {
    pub fn new(index: &'a IdentityIndex, links: LookupTable, content_version_dir: &Path) -> Self {
        Self {
            inner: RecordMigration::new(
                AssociationResolver::new(index, vec![parent_field()]),
                RowProjector::new(manifest_fields(content_version_dir, "Title")),
            ),
            links,
        }
    }
}

impl Transformer for ContentVersionMigration<'_> {
    type Input = SourceRecord;
    type Output = Vec<ProjectedRow>;

    fn transform(&self, record: Self::Input) -> Result<Self::Output> {
        if record.get("IsLatest") != Some("1") || record.get("FileType") == Some("SNOTE") {
            return Ok(Vec::new());
        }
        let Some(entity) = record
            .value("ContentDocumentId")
            .and_then(|doc| self.links.get(doc))
            .cloned()
        else {
            return Ok(Vec::new());
        };
        self.inner.transform(record.with_field(PARENT, entity))
    }
}

/// Build the upload manifest from attachments and content versions
pub fn build_manifest(config: &MigrationConfig, index: &IdentityIndex) -> Result<JobReport> {
    let headers = manifest_fields(Path::new(""), "Name").headers();
    let mut exporter = PartitionedExporter::new(
        &config.output_dir,
        MANIFEST_DATASET,
        ExportFormat::Json,
        headers,
        config.max_chunk_bytes,
    );
    let mut report = JobReport::new("manifest");

    let attachments = CsvSource::new(config.csv_path("Attachment.csv"));
    log::info!("Processing {}", attachments.path().display().bright_black());
    let stats = Pipeline::new(
        attachments,
        attachment_migration(index, &config.attachments_dir),
        &mut exporter,
    )
    .run()?;
    report.absorb(stats);

    let links = tables::document_links(
        &config.csv_path("ContentDocumentLink.csv"),
        LinkPolicy::Last,
    )?;
    let versions = CsvSource::new(config.csv_path("ContentVersion.csv"));
    log::info!("Processing {}", versions.path().display().bright_black());
    let stats = Pipeline::new(
        versions,
        ContentVersionMigration::new(index, links, &config.content_version_dir),
        &mut exporter,
    )
    .run()?;
    report.absorb(stats);

    report.exports.push(exporter.finalize());
    Ok(report)
}
