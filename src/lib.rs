//! CRM Migrator
//!
//! Turns a Salesforce export (CSV tables plus attachment folders) into
//! chunked HubSpot import files, and uploads exported files to the records
//! they belong to.

pub mod cli;
pub mod client;
pub mod config;
pub mod etl;
pub mod export;
pub mod files;
pub mod identity;
pub mod jobs;
pub mod project;
pub mod resolve;
pub mod storage;

// Re-exports for convenience
pub use client::{FileAttacher, HubSpotClient};
pub use config::MigrationConfig;
pub use etl::{Extractor, Loader, Pipeline, Transformer};
pub use export::{ExportFormat, PartitionedExporter};
pub use identity::{EntityPrefix, IdentityIndex, ObjectType};
pub use resolve::{Association, AssociationResolver, ReferenceField};
pub use storage::{CsvSource, NdjsonReader, SourceRecord};
