//! Shared record → rows transformation

use crate::etl::{PipelineStats, Transformer};
use crate::export::ExportSummary;
use crate::project::{ProjectedRow, RowProjector};
use crate::resolve::AssociationResolver;
use crate::storage::SourceRecord;

use eyre::Result;
use owo_colors::OwoColorize;
use std::cell::Cell;
use std::fmt;

/// Predicate deciding whether a source record takes part in a job
pub type RecordFilter<'a> = Box<dyn Fn(&SourceRecord) -> bool + 'a>;

/// Filter → resolve → project, one row per resolved association
///
/// Records rejected by the filter, without any association, or whose
/// required column projects to an empty value produce no rows.
pub struct RecordMigration<'a> {
    resolver: AssociationResolver<'a>,
    projector: RowProjector,
    filter: Option<RecordFilter<'a>>,
    required: Option<usize>,
    skipped_empty: Cell<usize>,
}

impl<'a> RecordMigration<'a> {
    pub fn new(resolver: AssociationResolver<'a>, projector: RowProjector) -> Self {
        Self {
            resolver,
            projector,
            filter: None,
            required: None,
            skipped_empty: Cell::new(0),
        }
    }

    pub fn with_filter(mut self, filter: impl Fn(&SourceRecord) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Drop rows whose `column` is empty
    ///
    /// Unknown column names are ignored.
    pub fn require(mut self, column: &str) -> Self {
        self.required = self.projector.field_map().position(column);
        if self.required.is_none() {
            log::warn!("Required column '{}' is not part of the schema", column);
        }
        self
    }

    pub fn headers(&self) -> Vec<String> {
        self.projector.headers()
    }

    /// Records dropped because the required column was empty
    pub fn skipped_empty(&self) -> usize {
        self.skipped_empty.get()
    }
}

impl Transformer for RecordMigration<'_> {
    type Input = SourceRecord;
    type Output = Vec<ProjectedRow>;

    fn transform(&self, record: Self::Input) -> Result<Self::Output> {
        if let Some(filter) = &self.filter
            && !filter(&record)
        {
            return Ok(Vec::new());
        }

        let associations = self.resolver.resolve(&record);
        if associations.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.projector.project_all(&record, &associations);
        if let Some(i) = self.required
            && rows
                .first()
                .is_some_and(|row| row.values.get(i).is_none_or(String::is_empty))
        {
            self.skipped_empty.set(self.skipped_empty.get() + 1);
            return Ok(Vec::new());
        }
        Ok(rows)
    }
}

/// Outcome of one migration job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: &'static str,
    pub stats: PipelineStats,
    /// Records dropped for an empty body
    pub skipped_empty: usize,
    pub exports: Vec<ExportSummary>,
}

impl JobReport {
    pub fn new(job: &'static str) -> Self {
        Self {
            job,
            stats: PipelineStats::default(),
            skipped_empty: 0,
            exports: Vec::new(),
        }
    }

    /// Add the counters of one more pipeline run
    pub fn absorb(&mut self, stats: PipelineStats) {
        self.stats.read += stats.read;
        self.stats.unreadable += stats.unreadable;
        self.stats.failed += stats.failed;
        self.stats.skipped += stats.skipped;
        self.stats.emitted += stats.emitted;
        self.stats.loaded += stats.loaded;
    }

    /// Rows that reached an export file
    pub fn rows_written(&self) -> usize {
        self.exports.iter().map(ExportSummary::rows).sum()
    }

    pub fn export(&self, dataset: &str) -> Option<&ExportSummary> {
        self.exports.iter().find(|e| e.dataset == dataset)
    }

    pub fn has_failures(&self) -> bool {
        self.exports.iter().any(ExportSummary::has_failures)
    }

    /// Log the terminal summary
    pub fn log(&self) {
        log::info!("{} complete: {}", self.job.cyan(), self.stats);
        if self.skipped_empty > 0 {
            log::info!(
                "Skipped {} record(s) with an empty body",
                self.skipped_empty.yellow()
            );
        }
        for export in &self.exports {
            export.log();
        }
        log::info!("Total rows written: {}", self.rows_written().green());
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job, self.stats)?;
        if self.skipped_empty > 0 {
            write!(f, ", empty body {}", self.skipped_empty)?;
        }
        for export in &self.exports {
            write!(f, "\n  {}", export)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{EntityPrefix, IdentityIndex, ObjectType};
    use crate::project::{FieldExpr, FieldMap};
    use crate::resolve::ReferenceField;

    fn index() -> IdentityIndex {
        let mut index = IdentityIndex::new();
        index.insert(EntityPrefix::Contact, "003xx1", "301");
        index.insert(EntityPrefix::Account, "001xx1", "111");
        index
    }

    fn projector() -> RowProjector {
        RowProjector::new(
            FieldMap::new()
                .column("Record ID", FieldExpr::AssociationId)
                .column("Body", FieldExpr::column("Body")),
        )
    }

    fn record(who: &str, account: &str, body: &str) -> SourceRecord {
        SourceRecord::from_pairs([("WhoId", who), ("AccountId", account), ("Body", body)])
    }

    #[test]
    fn test_fan_out() {
        let index = index();
        let migration = RecordMigration::new(
            AssociationResolver::new(&index, ReferenceField::activity_fields()),
            projector(),
        );

        let rows = migration.transform(record("003xx1", "001xx1", "hi")).unwrap();
        assert_eq!(
            rows,
            vec![
                ProjectedRow::new(ObjectType::Person, vec!["301".into(), "hi".into()]),
                ProjectedRow::new(ObjectType::Organization, vec!["111".into(), "hi".into()]),
            ]
        );
        assert!(migration.transform(record("", "", "hi")).unwrap().is_empty());
    }

    #[test]
    fn test_filter_and_required() {
        let index = index();
        let migration = RecordMigration::new(
            AssociationResolver::new(&index, ReferenceField::activity_fields()),
            projector(),
        )
        .with_filter(|r| r.get("Body") != Some("skip me"))
        .require("Body");

        assert!(migration.transform(record("003xx1", "", "skip me")).unwrap().is_empty());
        assert_eq!(migration.skipped_empty(), 0);
        assert!(migration.transform(record("003xx1", "", "")).unwrap().is_empty());
        assert_eq!(migration.skipped_empty(), 1);
        assert_eq!(migration.transform(record("003xx1", "", "ok")).unwrap().len(), 1);
    }

    #[test]
    fn test_report_absorb() {
        let mut report = JobReport::new("notes");
        let stats = PipelineStats {
            read: 3,
            skipped: 1,
            emitted: 2,
            loaded: 2,
            ..Default::default()
        };
        report.absorb(stats);
        report.absorb(stats);
        assert_eq!(report.stats.read, 6);
        assert_eq!(report.stats.loaded, 4);
        assert_eq!(report.rows_written(), 0);
        assert!(report.to_string().starts_with("notes: read 6"));
    }
}
