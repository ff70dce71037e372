//! Closed enumeration of source identifier prefixes
//!
//! Every Salesforce record key starts with a three character prefix naming
//! the kind of record it is. The migrator only cares about a handful of them,
//! and each one always lands in the same destination object type.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Destination (HubSpot) object type a row is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Person,
    Organization,
    Deal,
    Other,
}

impl ObjectType {
    pub const ALL: [ObjectType; 4] = [
        ObjectType::Person,
        ObjectType::Organization,
        ObjectType::Deal,
        ObjectType::Other,
    ];

    /// Partition name used in output file names (`contacts`, `companies`, ...)
    pub fn partition_name(&self) -> &'static str {
        match self {
            ObjectType::Person => "contacts",
            ObjectType::Organization => "companies",
            ObjectType::Deal => "deals",
            ObjectType::Other => "other",
        }
    }

    /// Association key of the engagements API (`contactIds`, ...)
    ///
    /// `Other` has no destination object to attach to.
    pub fn association_key(&self) -> Option<&'static str> {
        match self {
            ObjectType::Person => Some("contactIds"),
            ObjectType::Organization => Some("companyIds"),
            ObjectType::Deal => Some("dealIds"),
            ObjectType::Other => None,
        }
    }

    /// Look an object type up by its partition name
    pub fn from_partition_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.partition_name() == name)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.partition_name())
    }
}

/// Known Salesforce identifier prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityPrefix {
    /// Account
    #[serde(rename = "001")]
    Account,
    /// Contact
    #[serde(rename = "003")]
    Contact,
    /// Lead
    #[serde(rename = "00Q")]
    Lead,
    /// Opportunity
    #[serde(rename = "006")]
    Opportunity,
    /// Case
    #[serde(rename = "500")]
    Case,
}

impl EntityPrefix {
    pub const ALL: [EntityPrefix; 5] = [
        EntityPrefix::Account,
        EntityPrefix::Contact,
        EntityPrefix::Lead,
        EntityPrefix::Opportunity,
        EntityPrefix::Case,
    ];

    /// The three character code
    pub fn code(&self) -> &'static str {
        match self {
            EntityPrefix::Account => "001",
            EntityPrefix::Contact => "003",
            EntityPrefix::Lead => "00Q",
            EntityPrefix::Opportunity => "006",
            EntityPrefix::Case => "500",
        }
    }

    /// Destination object type records of this kind migrate to
    pub fn object_type(&self) -> ObjectType {
        match self {
            EntityPrefix::Account => ObjectType::Organization,
            EntityPrefix::Contact | EntityPrefix::Lead => ObjectType::Person,
            EntityPrefix::Opportunity => ObjectType::Deal,
            EntityPrefix::Case => ObjectType::Other,
        }
    }

    /// Prefix of an identifier, if it is one we know
    ///
    /// # Example
    /// ```
    /// use crm_migrator::identity::EntityPrefix;
    ///
    /// assert_eq!(EntityPrefix::of("00Q5e00000AbCdEf"), Some(EntityPrefix::Lead));
    /// assert_eq!(EntityPrefix::of("0Q"), None);
    /// assert_eq!(EntityPrefix::of("a0B5e00000AbCdEf"), None);
    /// ```
    pub fn of(id: &str) -> Option<Self> {
        id.get(..3).and_then(|code| code.parse().ok())
    }
}

impl FromStr for EntityPrefix {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| eyre::eyre!("Unknown identifier prefix: {}", s))
    }
}

impl std::fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
