//! Chunked export of projected rows
//!
//! Every dataset is split by destination object type and each partition is
//! written as a numbered series of chunk files that stay under the import
//! size limit:
//!
//! ```text
//! hubspot_import_calls_contacts_chunk1.csv
//! hubspot_import_calls_contacts_chunk2.csv
//! hubspot_import_calls_companies_chunk1.csv
//! ```

mod chunk;
mod codec;
mod partitioned;

pub use chunk::{ChunkInfo, ChunkWriter, PartitionSummary};
pub use codec::{ExportFormat, encode_csv_row, encode_json_row};
pub use partitioned::{ExportSummary, PartitionedExporter};

/// Default chunk budget: the 511 MiB import ceiling minus an 11 MiB margin
pub const DEFAULT_MAX_CHUNK_BYTES: u64 = 500 * 1024 * 1024;
