//! Enhanced notes (ContentVersion SNOTE files) → note import

use super::tables::{self, LinkPolicy};
use super::{JobReport, RecordMigration};
use crate::config::MigrationConfig;
use crate::etl::{Pipeline, Transformer};
use crate::export::{ExportFormat, PartitionedExporter};
use crate::identity::IdentityIndex;
use crate::project::{FieldExpr, FieldMap, LookupTable, ProjectedRow, RowProjector};
use crate::resolve::{AssociationResolver, ReferenceField};
use crate::storage::{CsvSource, SourceRecord};

use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

pub const SNOTES_DATASET: &str = "hubspot_import_notes";

const LINKED_ENTITY: &str = "LinkedEntityId";
const NOTE_BODY: &str = "NoteBody";

pub fn snote_fields() -> FieldMap {
    FieldMap::new()
        .column("Record ID", FieldExpr::AssociationId)
        .column("Note Body", FieldExpr::column(NOTE_BODY))
        .column("Timestamp", FieldExpr::column("CreatedDate"))
}

/// Joins each latest SNOTE version with its document link and file body
pub struct SnoteMigration<'a> {
    inner: RecordMigration<'a>,
    links: LookupTable,
    notes_dir: PathBuf,
}

impl<'a> SnoteMigration<'a> {
    pub fn new(
        index: &'a IdentityIndex,
        links: LookupTable,
        notes_dir: impl AsRef<Path>,
        skip_empty_bodies: bool,
    ) -> Self {
        let inner = RecordMigration::new(
            AssociationResolver::new(index, vec![ReferenceField::parent(LINKED_ENTITY)]),
            RowProjector::new(snote_fields()),
        );
        Self {
            inner: if skip_empty_bodies {
                inner.require("Note Body")
            } else {
                inner
            },
            links,
            notes_dir: notes_dir.as_ref().to_path_buf(),
        }
    }

    pub fn headers(&self) -> Vec<String> {
        self.inner.headers()
    }

    pub fn skipped_empty(&self) -> usize {
        self.inner.skipped_empty()
    }
}

fn is_latest_snote(record: &SourceRecord) -> bool {
    record.get("IsLatest") == Some("1") && record.get("FileType") == Some("SNOTE")
}

impl Transformer for SnoteMigration<'_> {
    type Input = SourceRecord;
    type Output = Vec<ProjectedRow>;

    fn transform(&self, record: Self::Input) -> Result<Self::Output> {
        if !is_latest_snote(&record) {
            return Ok(Vec::new());
        }
        let Some(entity) = record
            .value("ContentDocumentId")
            .and_then(|doc| self.links.get(doc))
            .cloned()
        else {
            return Ok(Vec::new());
        };
        let Some(id) = record.value("Id") else {
            return Ok(Vec::new());
        };

        let path = self.notes_dir.join(id.trim());
        let body = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read note file for [{}]", id))?;

        self.inner.transform(
            record
                .with_field(LINKED_ENTITY, entity)
                .with_field(NOTE_BODY, body),
        )
    }
}

/// Convert enhanced notes into a note import
pub fn migrate_snotes(config: &MigrationConfig, index: &IdentityIndex) -> Result<JobReport> {
    let links = tables::document_links(
        &config.csv_path("ContentDocumentLink.csv"),
        LinkPolicy::First,
    )?;

    let source = CsvSource::new(config.csv_path("ContentVersion.csv"));
    log::info!("Processing {}", source.path().display().bright_black());

    let migration = SnoteMigration::new(
        index,
        links,
        &config.content_version_dir,
        config.skip_rows_with_empty_body,
    );
    let exporter = PartitionedExporter::new(
        &config.output_dir,
        SNOTES_DATASET,
        ExportFormat::Csv,
        migration.headers(),
        config.max_chunk_bytes,
    );

    let mut pipeline = Pipeline::new(source, &migration, exporter);
    let stats = pipeline.run()?;

    let mut report = JobReport::new("snotes");
    report.absorb(stats);
    report.skipped_empty = migration.skipped_empty();
    report.exports.push(pipeline.into_loader().finalize());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{EntityPrefix, ObjectType};
    use tempfile::TempDir;

    fn version(id: &str, document: &str, latest: &str, file_type: &str) -> SourceRecord {
        SourceRecord::from_pairs([
            ("Id", id),
            ("ContentDocumentId", document),
            ("IsLatest", latest),
            ("FileType", file_type),
            ("CreatedDate", "2024-03-03T09:30:00.000Z"),
        ])
    }

    fn setup() -> (TempDir, IdentityIndex, LookupTable) {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("068A"), "<p>Kickoff notes</p>").unwrap();

        let mut index = IdentityIndex::new();
        index.insert(EntityPrefix::Contact, "003xx1", "301");

        let mut links = LookupTable::new();
        links.insert("069A".to_string(), "003xx1".to_string());
        links.insert("069B".to_string(), "003xx1".to_string());
        (temp, index, links)
    }

    #[test]
    fn test_snote_with_body() {
        let (temp, index, links) = setup();
        let migration = SnoteMigration::new(&index, links, temp.path(), true);

        let rows = migration.transform(version("068A", "069A", "1", "SNOTE")).unwrap();
        assert_eq!(
            rows,
            vec![ProjectedRow::new(
                ObjectType::Person,
                vec![
                    "301".into(),
                    "<p>Kickoff notes</p>".into(),
                    "2024-03-03T09:30:00.000Z".into(),
                ]
            )]
        );
    }

    #[test]
    fn test_non_snotes_and_unlinked_skipped() {
        let (temp, index, links) = setup();
        let migration = SnoteMigration::new(&index, links, temp.path(), true);

        assert!(migration.transform(version("068A", "069A", "0", "SNOTE")).unwrap().is_empty());
        assert!(migration.transform(version("068A", "069A", "1", "PDF")).unwrap().is_empty());
        assert!(migration.transform(version("068A", "069Z", "1", "SNOTE")).unwrap().is_empty());
    }

    #[test]
    fn test_missing_note_file_is_an_error() {
        let (temp, index, links) = setup();
        let migration = SnoteMigration::new(&index, links, temp.path(), true);

        let err = migration
            .transform(version("068B", "069B", "1", "SNOTE"))
            .unwrap_err();
        assert!(err.to_string().contains("068B"));
    }
}
