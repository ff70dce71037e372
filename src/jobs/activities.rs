//! Event.csv → call, meeting and email engagement imports

use super::JobReport;
use crate::config::{ActivityTypes, MigrationConfig};
use crate::etl::{Loader, Pipeline, Transformer};
use crate::export::{ExportFormat, ExportSummary, PartitionedExporter};
use crate::identity::IdentityIndex;
use crate::project::{FieldExpr, FieldMap, ProjectedRow, RowProjector};
use crate::resolve::{AssociationResolver, ReferenceField};
use crate::storage::{CsvSource, SourceRecord};

use eyre::Result;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Destination engagement kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engagement {
    Calls,
    Meetings,
    Emails,
}

impl Engagement {
    pub const ALL: [Engagement; 3] = [Engagement::Calls, Engagement::Meetings, Engagement::Emails];

    pub fn name(&self) -> &'static str {
        match self {
            Engagement::Calls => "calls",
            Engagement::Meetings => "meetings",
            Engagement::Emails => "emails",
        }
    }

    /// Output dataset name, e.g. `hubspot_import_calls`
    pub fn dataset(&self) -> String {
        format!("hubspot_import_{}", self.name())
    }

    /// Import schema of this engagement for activity records
    pub fn field_map(&self) -> FieldMap {
        let activity_date = FieldExpr::first_of(&["ActivityDateTime", "CreatedDate"]);
        let map = FieldMap::new().column("Record ID", FieldExpr::AssociationId);
        match self {
            Engagement::Calls => map
                .column("Call notes", FieldExpr::column("Description"))
                .column("Activity date", activity_date)
                .column("Call direction", FieldExpr::constant("Outbound"))
                .column("Call title", FieldExpr::column("Subject")),
            Engagement::Meetings => map
                .column("Meeting description", FieldExpr::column("Description"))
                .column("Activity date", activity_date.clone())
                .column(
                    "Meeting start time",
                    FieldExpr::timestamp(activity_date.clone()),
                )
                .column(
                    "Meeting end time",
                    FieldExpr::end_time(activity_date, "DurationInMinutes"),
                )
                .column("Meeting title", FieldExpr::column("Subject")),
            Engagement::Emails => map
                .column("Email body", FieldExpr::column("Description"))
                .column("Activity date", activity_date)
                .column("Email direction", FieldExpr::constant("UNKNOWN"))
                .column("Email subject", FieldExpr::column("Subject")),
        }
    }
}

impl std::fmt::Display for Engagement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Routes each activity to its engagement schema
pub struct ActivityMigration<'a> {
    resolver: AssociationResolver<'a>,
    types: ActivityTypes,
    projectors: BTreeMap<Engagement, RowProjector>,
}

impl<'a> ActivityMigration<'a> {
    pub fn new(index: &'a IdentityIndex, types: ActivityTypes) -> Self {
        let projectors = Engagement::ALL
            .into_iter()
            .map(|e| (e, RowProjector::new(e.field_map())))
            .collect();
        Self {
            resolver: AssociationResolver::new(index, ReferenceField::activity_fields()),
            types,
            projectors,
        }
    }
}

impl Transformer for ActivityMigration<'_> {
    type Input = SourceRecord;
    type Output = Vec<(Engagement, ProjectedRow)>;

    fn transform(&self, record: Self::Input) -> Result<Self::Output> {
        let Some(engagement) = record
            .value("Type")
            .and_then(|t| self.types.engagement(t))
        else {
            return Ok(Vec::new());
        };
        let Some(projector) = self.projectors.get(&engagement) else {
            return Ok(Vec::new());
        };

        let associations = self.resolver.resolve(&record);
        Ok(projector
            .project_all(&record, &associations)
            .into_iter()
            .map(|row| (engagement, row))
            .collect())
    }
}

/// One chunked export per engagement
pub struct EngagementExporter {
    exporters: BTreeMap<Engagement, PartitionedExporter>,
}

impl EngagementExporter {
    pub fn new(dir: &Path, max_chunk_bytes: u64) -> Self {
        let exporters = Engagement::ALL
            .into_iter()
            .map(|e| {
                let exporter = PartitionedExporter::new(
                    dir,
                    &e.dataset(),
                    ExportFormat::Csv,
                    e.field_map().headers(),
                    max_chunk_bytes,
                );
                (e, exporter)
            })
            .collect();
        Self { exporters }
    }

    pub fn finalize(self) -> Vec<ExportSummary> {
        self.exporters
            .into_values()
            .map(PartitionedExporter::finalize)
            .collect()
    }
}

impl Loader for EngagementExporter {
    type Item = (Engagement, ProjectedRow);

    fn load(&mut self, items: Vec<Self::Item>) -> Result<usize> {
        let mut accepted = 0;
        for (engagement, row) in items {
            if let Some(exporter) = self.exporters.get_mut(&engagement)
                && exporter.write(&row)
            {
                accepted += 1;
            }
        }
        Ok(accepted)
    }
}

/// Convert Event.csv into engagement import files
pub fn migrate_activities(config: &MigrationConfig, index: &IdentityIndex) -> Result<JobReport> {
    let source = CsvSource::new(config.csv_path("Event.csv"));
    log::info!("Processing {}", source.path().display().bright_black());

    let mut pipeline = Pipeline::new(
        source,
        ActivityMigration::new(index, config.activity_types.clone()),
        EngagementExporter::new(&config.output_dir, config.max_chunk_bytes),
    );
    let stats = pipeline.run()?;

    let mut report = JobReport::new("activities");
    report.absorb(stats);
    report.exports = pipeline.into_loader().finalize();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{EntityPrefix, ObjectType};

    fn index() -> IdentityIndex {
        let mut index = IdentityIndex::new();
        index.insert(EntityPrefix::Lead, "00Qxx1", "401");
        index.insert(EntityPrefix::Account, "001xx1", "111");
        index.insert(EntityPrefix::Opportunity, "006xx1", "601");
        index
    }

    fn event(kind: &str) -> SourceRecord {
        SourceRecord::from_pairs([
            ("Type", kind),
            ("WhoId", "00Qxx1"),
            ("AccountId", "001xx1"),
            ("WhatId", "006xx1"),
            ("Subject", "Intro"),
            ("Description", "notes"),
            ("ActivityDateTime", "2024-05-02T15:00:00.000+0000"),
            ("CreatedDate", "2024-05-01T08:00:00.000Z"),
            ("DurationInMinutes", "45"),
        ])
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            Engagement::Calls.field_map().headers(),
            vec!["Record ID", "Call notes", "Activity date", "Call direction", "Call title"]
        );
        assert_eq!(Engagement::Meetings.field_map().len(), 6);
        assert_eq!(Engagement::Emails.dataset(), "hubspot_import_emails");
    }

    #[test]
    fn test_call_fans_out_to_every_association() {
        let index = index();
        let migration = ActivityMigration::new(&index, ActivityTypes::default());

        let rows = migration.transform(event("Qual Call")).unwrap();
        let targets: Vec<_> = rows
            .iter()
            .map(|(e, row)| (*e, row.object_type, row.values[0].as_str()))
            .collect();
        assert_eq!(
            targets,
            vec![
                (Engagement::Calls, ObjectType::Person, "401"),
                (Engagement::Calls, ObjectType::Organization, "111"),
                (Engagement::Calls, ObjectType::Deal, "601"),
            ]
        );
        assert_eq!(
            rows[0].1.values[1..],
            ["notes", "2024-05-02T15:00:00.000+0000", "Outbound", "Intro"]
        );
    }

    #[test]
    fn test_meeting_times() {
        let index = index();
        let migration = ActivityMigration::new(&index, ActivityTypes::default());

        let rows = migration.transform(event("Demo")).unwrap();
        let (engagement, row) = &rows[0];
        assert_eq!(*engagement, Engagement::Meetings);
        assert_eq!(row.values[3], "2024-05-02T15:00:00.000Z");
        assert_eq!(row.values[4], "2024-05-02T15:45:00.000Z");
    }

    #[test]
    fn test_unmapped_type_skipped() {
        let index = index();
        let migration = ActivityMigration::new(&index, ActivityTypes::default());
        assert!(migration.transform(event("Lunch")).unwrap().is_empty());
        assert!(migration.transform(event("")).unwrap().is_empty());
    }
}
