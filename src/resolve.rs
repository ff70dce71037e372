//! Association resolution
//!
//! A source record can point at its parents through several reference
//! fields (Salesforce's `WhoId`, `AccountId`, `WhatId`, `ParentId`, ...).
//! Each field accepts a few identifier prefixes; every reference that maps
//! through the [`IdentityIndex`] becomes one [`Association`], and a record
//! with several of them fans out into one output row per association.

use crate::identity::{EntityPrefix, IdentityIndex, ObjectType};
use crate::storage::SourceRecord;

use serde::{Deserialize, Serialize};

/// Which prefixes a reference field accepts and where they land
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceField {
    /// Column holding the reference
    pub field: String,

    /// Prefixes this field may legitimately carry
    pub accepted_prefixes: Vec<EntityPrefix>,

    /// Destination object type for every accepted prefix; when absent each
    /// prefix keeps its own object type
    #[serde(default)]
    pub object_type: Option<ObjectType>,
}

impl ReferenceField {
    pub fn new(field: &str, accepted_prefixes: &[EntityPrefix]) -> Self {
        Self {
            field: field.to_string(),
            accepted_prefixes: accepted_prefixes.to_vec(),
            object_type: None,
        }
    }

    /// Force every accepted prefix onto one destination object type
    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = Some(object_type);
        self
    }

    /// The activity "who" reference: contacts and leads
    pub fn who() -> Self {
        Self::new("WhoId", &[EntityPrefix::Contact, EntityPrefix::Lead])
    }

    /// The activity account reference
    pub fn account() -> Self {
        Self::new("AccountId", &[EntityPrefix::Account])
    }

    /// The activity "what" reference, limited to opportunities
    pub fn what() -> Self {
        Self::new("WhatId", &[EntityPrefix::Opportunity])
    }

    /// A polymorphic parent reference accepting every known prefix
    pub fn parent(field: &str) -> Self {
        Self::new(field, &EntityPrefix::ALL)
    }

    /// Activity references in their fan-out order: who → account → what
    pub fn activity_fields() -> Vec<Self> {
        vec![Self::who(), Self::account(), Self::what()]
    }

    fn accepts(&self, prefix: EntityPrefix) -> bool {
        self.accepted_prefixes.contains(&prefix)
    }
}

/// A resolved destination association
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Association {
    pub object_type: ObjectType,
    pub destination_id: String,
}

impl Association {
    pub fn new(object_type: ObjectType, destination_id: impl Into<String>) -> Self {
        Self {
            object_type,
            destination_id: destination_id.into(),
        }
    }
}

/// Resolves a record's reference fields against an identity index
///
/// # Example
/// ```
/// use crm_migrator::identity::{EntityPrefix, IdentityIndex, ObjectType};
/// use crm_migrator::resolve::{Association, AssociationResolver, ReferenceField};
/// use crm_migrator::storage::SourceRecord;
///
/// let mut index = IdentityIndex::new();
/// index.insert(EntityPrefix::Account, "001xx1", "111");
///
/// let resolver = AssociationResolver::new(&index, ReferenceField::activity_fields());
/// let record = SourceRecord::from_pairs([("AccountId", "001xx1"), ("WhoId", ""), ("WhatId", "")]);
///
/// assert_eq!(
///     resolver.resolve(&record),
///     vec![Association::new(ObjectType::Organization, "111")]
/// );
/// ```
pub struct AssociationResolver<'a> {
    index: &'a IdentityIndex,
    fields: Vec<ReferenceField>,
}

impl<'a> AssociationResolver<'a> {
    pub fn new(index: &'a IdentityIndex, fields: Vec<ReferenceField>) -> Self {
        Self { index, fields }
    }

    /// Resolve one reference value against a field spec
    pub fn resolve_reference(&self, field: &ReferenceField, reference: &str) -> Option<Association> {
        let prefix = EntityPrefix::of(reference).filter(|p| field.accepts(*p))?;
        let destination_id = self.index.resolve(prefix, reference)?;
        Some(Association::new(
            field.object_type.unwrap_or(prefix.object_type()),
            destination_id,
        ))
    }

    /// All associations of a record, in field declaration order
    ///
    /// References with an unknown or unaccepted prefix, or without a
    /// mapping, contribute nothing. A pair reached through two fields is
    /// returned once.
    pub fn resolve(&self, record: &SourceRecord) -> Vec<Association> {
        let mut associations: Vec<Association> = Vec::new();

        for field in &self.fields {
            let Some(reference) = record.value(&field.field) else {
                continue;
            };

            match self.resolve_reference(field, reference) {
                Some(association) if !associations.contains(&association) => {
                    associations.push(association);
                }
                Some(_) => {}
                None => log::trace!("{} {} did not resolve", field.field, reference),
            }
        }

        associations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> IdentityIndex {
        let mut index = IdentityIndex::new();
        index.insert(EntityPrefix::Account, "001xx1", "111");
        index.insert(EntityPrefix::Contact, "003xx1", "301");
        index.insert(EntityPrefix::Lead, "00Qxx1", "401");
        index.insert(EntityPrefix::Opportunity, "006xx1", "601");
        index
    }

    fn activity(who: &str, account: &str, what: &str) -> SourceRecord {
        SourceRecord::from_pairs([("WhoId", who), ("AccountId", account), ("WhatId", what)])
    }

    #[test]
    fn test_single_account_reference() {
        let index = index();
        let resolver = AssociationResolver::new(&index, ReferenceField::activity_fields());

        let associations = resolver.resolve(&activity("", "001xx1", ""));
        assert_eq!(associations, vec![Association::new(ObjectType::Organization, "111")]);
    }

    #[test]
    fn test_fan_out_keeps_who_account_what_order() {
        let index = index();
        let resolver = AssociationResolver::new(&index, ReferenceField::activity_fields());

        let associations = resolver.resolve(&activity("00Qxx1", "001xx1", "006xx1"));
        assert_eq!(
            associations,
            vec![
                Association::new(ObjectType::Person, "401"),
                Association::new(ObjectType::Organization, "111"),
                Association::new(ObjectType::Deal, "601"),
            ]
        );
    }

    #[test]
    fn test_unaccepted_prefix_contributes_nothing() {
        let index = index();
        let resolver = AssociationResolver::new(&index, ReferenceField::activity_fields());

        // an account id in the "what" slot is not an opportunity
        assert!(resolver.resolve(&activity("", "", "001xx1")).is_empty());
        // unknown prefix
        assert!(resolver.resolve(&activity("a0Bxx1", "", "")).is_empty());
        // known prefix without mapping
        assert!(resolver.resolve(&activity("003zz9", "", "")).is_empty());
    }

    #[test]
    fn test_missing_fields_resolve_to_nothing() {
        let index = index();
        let resolver = AssociationResolver::new(&index, ReferenceField::activity_fields());
        assert!(resolver.resolve(&SourceRecord::from_pairs([("Id", "x")])).is_empty());
    }

    #[test]
    fn test_parent_accepts_every_prefix() {
        let index = index();
        let resolver = AssociationResolver::new(&index, vec![ReferenceField::parent("ParentId")]);

        let record = SourceRecord::from_pairs([("ParentId", "006xx1")]);
        assert_eq!(
            resolver.resolve(&record),
            vec![Association::new(ObjectType::Deal, "601")]
        );
    }

    #[test]
    fn test_duplicate_pairs_collapse() {
        let index = index();
        let resolver = AssociationResolver::new(
            &index,
            vec![ReferenceField::parent("ParentId"), ReferenceField::account()],
        );

        let record = SourceRecord::from_pairs([("ParentId", "001xx1"), ("AccountId", "001xx1")]);
        assert_eq!(resolver.resolve(&record).len(), 1);
    }

    #[test]
    fn test_object_type_override() {
        let index = index();
        let field = ReferenceField::new("CaseContact", &[EntityPrefix::Contact])
            .with_object_type(ObjectType::Other);
        let resolver = AssociationResolver::new(&index, vec![field]);

        let record = SourceRecord::from_pairs([("CaseContact", "003xx1")]);
        assert_eq!(
            resolver.resolve(&record),
            vec![Association::new(ObjectType::Other, "301")]
        );
    }
}
