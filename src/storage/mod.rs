//! File system storage operations
//!
//! This module handles the plain file I/O the jobs share:
//! - Streaming header-rowed CSV source tables
//! - Reading newline-delimited JSON manifests

mod csv_source;
mod ndjson;

pub use csv_source::{CsvSource, SourceRecord, SourceRowStream};
pub use ndjson::{NdjsonReader, NdjsonStream};
