//! Row projection into destination import schemas
//!
//! A [`RowProjector`] turns one source record plus one resolved
//! [`Association`] into a [`ProjectedRow`] with exactly the columns of its
//! [`FieldMap`], in order.

mod field_map;
pub mod timestamp;

pub use field_map::{FieldExpr, FieldMap, LookupTable};

use crate::identity::ObjectType;
use crate::resolve::Association;
use crate::storage::SourceRecord;

use std::collections::HashMap;

/// A destination-shaped row bound for one object type partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    pub object_type: ObjectType,
    pub values: Vec<String>,
}

impl ProjectedRow {
    pub fn new(object_type: ObjectType, values: Vec<String>) -> Self {
        Self {
            object_type,
            values,
        }
    }
}

/// Projects records through a field map
pub struct RowProjector {
    field_map: FieldMap,
    lookups: HashMap<String, LookupTable>,
}

impl RowProjector {
    pub fn new(field_map: FieldMap) -> Self {
        Self {
            field_map,
            lookups: HashMap::new(),
        }
    }

    /// Register a lookup table for [`FieldExpr::Lookup`] columns
    pub fn with_lookup(mut self, name: &str, table: LookupTable) -> Self {
        self.lookups.insert(name.to_string(), table);
        self
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn headers(&self) -> Vec<String> {
        self.field_map.headers()
    }

    /// Project one record for one association
    pub fn project(&self, record: &SourceRecord, association: &Association) -> ProjectedRow {
        let values = self
            .field_map
            .iter()
            .map(|(_, expr)| expr.evaluate(record, association, &self.lookups))
            .collect();
        ProjectedRow::new(association.object_type, values)
    }

    /// One row per association, in association order
    pub fn project_all(
        &self,
        record: &SourceRecord,
        associations: &[Association],
    ) -> Vec<ProjectedRow> {
        associations
            .iter()
            .map(|association| self.project(record, association))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting_map() -> FieldMap {
        let activity_date = FieldExpr::first_of(&["ActivityDateTime", "CreatedDate"]);
        FieldMap::new()
            .column("Record ID", FieldExpr::AssociationId)
            .column("Meeting description", FieldExpr::column("Description"))
            .column("Activity date", activity_date.clone())
            .column("Meeting start time", FieldExpr::timestamp(activity_date.clone()))
            .column(
                "Meeting end time",
                FieldExpr::end_time(activity_date, "DurationInMinutes"),
            )
            .column("Meeting title", FieldExpr::column("Subject"))
    }

    #[test]
    fn test_project_meeting() {
        let projector = RowProjector::new(meeting_map());
        let record = SourceRecord::from_pairs([
            ("Subject", "Kickoff"),
            ("ActivityDateTime", ""),
            ("CreatedDate", "2024-03-01T10:00:00.000Z"),
            ("DurationInMinutes", "90"),
        ]);

        let row = projector.project(&record, &Association::new(ObjectType::Deal, "601"));

        assert_eq!(row.object_type, ObjectType::Deal);
        assert_eq!(
            row.values,
            vec![
                "601",
                "",
                "2024-03-01T10:00:00.000Z",
                "2024-03-01T10:00:00.000Z",
                "2024-03-01T11:30:00.000Z",
                "Kickoff",
            ]
        );
    }

    #[test]
    fn test_every_declared_column_present() {
        let projector = RowProjector::new(meeting_map());
        let row = projector.project(
            &SourceRecord::from_pairs([("Id", "x")]),
            &Association::new(ObjectType::Person, "1"),
        );
        assert_eq!(row.values.len(), projector.field_map().len());
        assert_eq!(row.values[0], "1");
        assert!(row.values[1..].iter().all(String::is_empty));
    }

    #[test]
    fn test_lookup_with_fallback() {
        let mut bodies = LookupTable::new();
        bodies.insert("00T1".to_string(), "<p>full body</p>".to_string());

        let map = FieldMap::new().column(
            "Email body",
            FieldExpr::lookup("bodies", "Id", FieldExpr::column("Description")),
        );
        let projector = RowProjector::new(map).with_lookup("bodies", bodies);
        let association = Association::new(ObjectType::Person, "1");

        let hit = SourceRecord::from_pairs([("Id", "00T1"), ("Description", "short")]);
        let miss = SourceRecord::from_pairs([("Id", "00T2"), ("Description", "short")]);
        assert_eq!(projector.project(&hit, &association).values, vec!["<p>full body</p>"]);
        assert_eq!(projector.project(&miss, &association).values, vec!["short"]);
    }

    #[test]
    fn test_decorated_concat() {
        let body = FieldExpr::Concat(vec![
            FieldExpr::decorated(FieldExpr::column("Title"), "Title: ", "\n\n"),
            FieldExpr::column("Body"),
        ]);
        let projector = RowProjector::new(FieldMap::new().column("Note Body", body));
        let association = Association::new(ObjectType::Organization, "1");

        let titled = SourceRecord::from_pairs([("Title", "Q3"), ("Body", "numbers")]);
        let untitled = SourceRecord::from_pairs([("Title", ""), ("Body", "numbers")]);
        assert_eq!(
            projector.project(&titled, &association).values,
            vec!["Title: Q3\n\nnumbers"]
        );
        assert_eq!(projector.project(&untitled, &association).values, vec!["numbers"]);
    }

    #[test]
    fn test_project_all_fans_out() {
        let projector = RowProjector::new(
            FieldMap::new()
                .column("Record ID", FieldExpr::AssociationId)
                .column("type", FieldExpr::ObjectType)
                .column("Subject", FieldExpr::column("Subject")),
        );
        let record = SourceRecord::from_pairs([("Subject", "Hello")]);
        let rows = projector.project_all(
            &record,
            &[
                Association::new(ObjectType::Person, "1"),
                Association::new(ObjectType::Organization, "2"),
            ],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values, vec!["1", "contacts", "Hello"]);
        assert_eq!(rows[1].values, vec!["2", "companies", "Hello"]);
    }
}
