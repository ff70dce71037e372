//! Note.csv → classic note import

use super::{JobReport, RecordMigration};
use crate::config::MigrationConfig;
use crate::etl::Pipeline;
use crate::export::{ExportFormat, PartitionedExporter};
use crate::identity::IdentityIndex;
use crate::project::{FieldExpr, FieldMap, RowProjector};
use crate::resolve::{AssociationResolver, ReferenceField};
use crate::storage::{CsvSource, SourceRecord};

use eyre::Result;
use owo_colors::OwoColorize;

pub const NOTES_DATASET: &str = "hubspot_import_classic_notes";

pub fn note_fields() -> FieldMap {
    FieldMap::new()
        .column("Record ID", FieldExpr::AssociationId)
        .column(
            "Note Body",
            FieldExpr::Concat(vec![
                FieldExpr::decorated(FieldExpr::column("Title"), "Title: ", "\n\n"),
                FieldExpr::column("Body"),
            ]),
        )
        .column("Timestamp", FieldExpr::column("CreatedDate"))
        .column("Title", FieldExpr::column("Title"))
        .column("Body", FieldExpr::column("Body"))
}

/// Live notes attached to something
fn is_live_note(record: &SourceRecord) -> bool {
    record.value("ParentId").is_some() && record.get("IsDeleted").map(str::trim) != Some("1")
}

pub fn note_migration(index: &IdentityIndex, skip_empty_bodies: bool) -> RecordMigration<'_> {
    let migration = RecordMigration::new(
        AssociationResolver::new(index, vec![ReferenceField::parent("ParentId")]),
        RowProjector::new(note_fields()),
    )
    .with_filter(is_live_note);
    if skip_empty_bodies {
        migration.require("Note Body")
    } else {
        migration
    }
}

/// Convert Note.csv into a classic note import
pub fn migrate_notes(config: &MigrationConfig, index: &IdentityIndex) -> Result<JobReport> {
    let source = CsvSource::new(config.csv_path("Note.csv"));
    log::info!("Processing {}", source.path().display().bright_black());

    let migration = note_migration(index, config.skip_rows_with_empty_body);
    let exporter = PartitionedExporter::new(
        &config.output_dir,
        NOTES_DATASET,
        ExportFormat::Csv,
        migration.headers(),
        config.max_chunk_bytes,
    );

    let mut pipeline = Pipeline::new(source, &migration, exporter);
    let stats = pipeline.run()?;

    let mut report = JobReport::new("notes");
    report.absorb(stats);
    report.skipped_empty = migration.skipped_empty();
    report.exports.push(pipeline.into_loader().finalize());
    Ok(report)
}
