//! Migration jobs
//!
//! Each job reads one or more source tables and produces a set of import
//! files (or, for `rename` and `import`, acts on the exported file folders):
//!
//! - [`migrate_activities`]: Event.csv → calls, meetings and emails
//! - [`migrate_task_emails`]: email tasks joined with their EmailMessage body
//! - [`migrate_notes`]: classic notes
//! - [`migrate_snotes`]: enhanced notes stored as content versions
//! - [`build_manifest`]: upload manifest for attachments and documents
//! - [`rename_files`]: readable names for exported files
//! - [`import_files`]: upload and attach the renamed files

mod activities;
mod file_manifest;
mod import_files;
mod notes;
mod record;
mod rename;
mod snotes;
pub mod tables;
mod task_emails;

pub use activities::{ActivityMigration, Engagement, EngagementExporter, migrate_activities};
pub use file_manifest::{
    ContentVersionMigration, MANIFEST_DATASET, ManifestEntry, attachment_migration, build_manifest,
};
pub use import_files::{ImportSummary, import_files, manifest_files};
pub use notes::{NOTES_DATASET, migrate_notes, note_fields, note_migration};
pub use record::{JobReport, RecordFilter, RecordMigration};
pub use rename::{RenameTarget, load_metadata, rename_files};
pub use snotes::{SNOTES_DATASET, SnoteMigration, migrate_snotes, snote_fields};
pub use task_emails::{
    TASK_EMAILS_DATASET, migrate_task_emails, task_email_fields, task_email_migration,
};
