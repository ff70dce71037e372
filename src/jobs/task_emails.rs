//! Task.csv email tasks → email engagement import

use super::{JobReport, RecordMigration, tables};
use crate::config::MigrationConfig;
use crate::etl::Pipeline;
use crate::export::{ExportFormat, PartitionedExporter};
use crate::identity::IdentityIndex;
use crate::project::{FieldExpr, FieldMap, LookupTable, RowProjector};
use crate::resolve::{AssociationResolver, ReferenceField};
use crate::storage::CsvSource;

use eyre::Result;
use owo_colors::OwoColorize;

pub const TASK_EMAILS_DATASET: &str = "hubspot_import_task_emails";

const EMAIL_BODIES: &str = "email_bodies";

/// Email schema for tasks: the EmailMessage body when there is one, else the
/// task description
pub fn task_email_fields() -> FieldMap {
    FieldMap::new()
        .column("Record ID", FieldExpr::AssociationId)
        .column(
            "Email body",
            FieldExpr::lookup(EMAIL_BODIES, "Id", FieldExpr::column("Description")),
        )
        .column(
            "Activity date",
            FieldExpr::first_of(&["ActivityDate", "CreatedDate"]),
        )
        .column("Email direction", FieldExpr::constant("UNKNOWN"))
        .column("Email subject", FieldExpr::column("Subject"))
}

/// Build the transformation for email tasks
pub fn task_email_migration<'a>(
    index: &'a IdentityIndex,
    bodies: LookupTable,
    skip_empty_bodies: bool,
) -> RecordMigration<'a> {
    let projector = RowProjector::new(task_email_fields()).with_lookup(EMAIL_BODIES, bodies);
    let migration = RecordMigration::new(
        AssociationResolver::new(index, ReferenceField::activity_fields()),
        projector,
    );
    if skip_empty_bodies {
        migration.require("Email body")
    } else {
        migration
    }
}

/// Convert email tasks into an email engagement import
pub fn migrate_task_emails(config: &MigrationConfig, index: &IdentityIndex) -> Result<JobReport> {
    let bodies_path = config.csv_path("EmailMessage.csv");
    let bodies = tables::email_bodies(&bodies_path).unwrap_or_else(|e| {
        log::warn!(
            "Could not load {}: {}. Falling back to task descriptions.",
            bodies_path.display(),
            e
        );
        LookupTable::new()
    });

    let email_types = &config.activity_types.emails;
    let source = CsvSource::new(config.csv_path("Task.csv"));
    log::info!("Processing {}", source.path().display().bright_black());

    // only tasks of an email type take part
    let migration = task_email_migration(index, bodies, config.skip_rows_with_empty_body)
        .with_filter(move |record| {
            record
                .value("Type")
                .is_some_and(|t| email_types.iter().any(|e| e.as_str() == t.trim()))
        });
    let exporter = PartitionedExporter::new(
        &config.output_dir,
        TASK_EMAILS_DATASET,
        ExportFormat::Csv,
        migration.headers(),
        config.max_chunk_bytes,
    );

    let mut pipeline = Pipeline::new(source, &migration, exporter);
    let stats = pipeline.run()?;

    let mut report = JobReport::new("task-emails");
    report.absorb(stats);
    report.skipped_empty = migration.skipped_empty();
    report.exports.push(pipeline.into_loader().finalize());
    Ok(report)
}
