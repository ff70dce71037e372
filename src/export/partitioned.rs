//! Routing projected rows to per-object-type partitions

use super::{ChunkWriter, ExportFormat, PartitionSummary};
use crate::etl::Loader;
use crate::identity::ObjectType;
use crate::project::ProjectedRow;

use eyre::Result;
use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

enum Partition {
    Open(ChunkWriter),
    Failed(PartitionSummary),
}

/// Exports one dataset, one chunked partition per destination object type
///
/// Writers are created on the first row of their object type. A write
/// failure takes only its own partition down: the error is logged, the rows
/// that would have followed are counted as dropped, and the other
/// partitions keep going.
pub struct PartitionedExporter {
    dir: PathBuf,
    dataset: String,
    format: ExportFormat,
    headers: Vec<String>,
    max_bytes: u64,
    partitions: BTreeMap<ObjectType, Partition>,
}

impl PartitionedExporter {
    pub fn new(
        dir: impl AsRef<Path>,
        dataset: &str,
        format: ExportFormat,
        headers: Vec<String>,
        max_bytes: u64,
    ) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            dataset: dataset.to_string(),
            format,
            headers,
            max_bytes,
            partitions: BTreeMap::new(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Write one row to its partition; `false` when the partition has failed
    pub fn write(&mut self, row: &ProjectedRow) -> bool {
        let partition = self.partitions.entry(row.object_type).or_insert_with(|| {
            Partition::Open(ChunkWriter::new(
                &self.dir,
                &self.dataset,
                row.object_type,
                self.format,
                self.headers.clone(),
                self.max_bytes,
            ))
        });

        let error = match partition {
            Partition::Open(writer) => match writer.write(&row.values) {
                Ok(()) => return true,
                Err(e) => e,
            },
            Partition::Failed(summary) => {
                summary.dropped += 1;
                return false;
            }
        };

        log::error!(
            "{} partition of {} failed: {:?}",
            row.object_type,
            self.dataset,
            error
        );
        if let Some(Partition::Open(writer)) = self.partitions.remove(&row.object_type) {
            self.partitions
                .insert(row.object_type, Partition::Failed(writer.abandon(1)));
        }
        false
    }

    /// Close every partition
    pub fn finalize(self) -> ExportSummary {
        let mut partitions = Vec::new();

        for (object_type, partition) in self.partitions {
            let summary = match partition {
                Partition::Open(writer) => match writer.finalize() {
                    Ok(summary) => summary,
                    Err(e) => {
                        log::error!("Failed to close {} partition: {:?}", object_type, e);
                        PartitionSummary {
                            object_type,
                            chunks: Vec::new(),
                            failed: true,
                            dropped: 0,
                        }
                    }
                },
                Partition::Failed(summary) => summary,
            };
            partitions.push(summary);
        }

        ExportSummary {
            dataset: self.dataset,
            partitions,
        }
    }
}

impl Loader for PartitionedExporter {
    type Item = ProjectedRow;

    fn load(&mut self, items: Vec<Self::Item>) -> Result<usize> {
        Ok(items.iter().filter(|row| self.write(row)).count())
    }
}

/// What one dataset export put on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub dataset: String,
    pub partitions: Vec<PartitionSummary>,
}

impl ExportSummary {
    pub fn rows(&self) -> usize {
        self.partitions.iter().map(PartitionSummary::rows).sum()
    }

    pub fn files(&self) -> Vec<&Path> {
        self.partitions
            .iter()
            .flat_map(|p| p.chunks.iter().map(|c| c.path.as_path()))
            .collect()
    }

    pub fn partition(&self, object_type: ObjectType) -> Option<&PartitionSummary> {
        self.partitions.iter().find(|p| p.object_type == object_type)
    }

    pub fn has_failures(&self) -> bool {
        self.partitions.iter().any(|p| p.failed)
    }

    /// Log one line per partition
    pub fn log(&self) {
        if self.partitions.is_empty() {
            log::info!("{}: nothing to write", self.dataset);
        }
        for partition in &self.partitions {
            if partition.failed {
                log::warn!(
                    "{} {}: {} row(s) written, {} dropped after a write failure",
                    self.dataset,
                    partition.object_type,
                    partition.rows(),
                    partition.dropped.red()
                );
            } else {
                log::info!(
                    "{} {}: {} row(s) in {} chunk(s)",
                    self.dataset,
                    partition.object_type,
                    partition.rows().green(),
                    partition.chunks.len()
                );
            }
        }
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.dataset)?;
        if self.partitions.is_empty() {
            return write!(f, " no rows");
        }
        for (i, partition) in self.partitions.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(
                f,
                "{}{} {} row(s) in {} chunk(s)",
                sep,
                partition.object_type,
                partition.rows(),
                partition.chunks.len()
            )?;
            if partition.failed {
                write!(f, " (failed, {} dropped)", partition.dropped)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(object_type: ObjectType, id: &str) -> ProjectedRow {
        ProjectedRow::new(object_type, vec![id.to_string(), "body".to_string()])
    }

    fn headers() -> Vec<String> {
        vec!["Record ID".to_string(), "Body".to_string()]
    }

    #[test]
    fn test_routes_by_object_type() {
        let temp = TempDir::new().unwrap();
        let mut exporter =
            PartitionedExporter::new(temp.path(), "ds", ExportFormat::Csv, headers(), 1024);

        let loaded = exporter
            .load(vec![
                row(ObjectType::Person, "1"),
                row(ObjectType::Organization, "2"),
                row(ObjectType::Person, "3"),
            ])
            .unwrap();
        assert_eq!(loaded, 3);

        let summary = exporter.finalize();
        assert_eq!(summary.rows(), 3);
        assert_eq!(summary.partition(ObjectType::Person).unwrap().rows(), 2);
        assert!(summary.partition(ObjectType::Deal).is_none());
        assert_eq!(
            std::fs::read_to_string(temp.path().join("ds_contacts_chunk1.csv")).unwrap(),
            "Record ID,Body\n1,body\n3,body\n"
        );
        assert!(temp.path().join("ds_companies_chunk1.csv").exists());
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_failed_partition_does_not_stop_others() {
        let temp = TempDir::new().unwrap();
        // a directory squatting on the contacts chunk name makes its create fail
        std::fs::create_dir(temp.path().join("ds_contacts_chunk1.csv")).unwrap();

        let mut exporter =
            PartitionedExporter::new(temp.path(), "ds", ExportFormat::Csv, headers(), 1024);
        let loaded = exporter
            .load(vec![
                row(ObjectType::Person, "1"),
                row(ObjectType::Deal, "2"),
                row(ObjectType::Person, "3"),
                row(ObjectType::Deal, "4"),
            ])
            .unwrap();
        assert_eq!(loaded, 2);

        let summary = exporter.finalize();
        let contacts = summary.partition(ObjectType::Person).unwrap();
        assert!(contacts.failed);
        assert_eq!(contacts.dropped, 2);
        assert_eq!(summary.partition(ObjectType::Deal).unwrap().rows(), 2);
        assert!(summary.has_failures());
        assert!(summary.to_string().contains("contacts 0 row(s) in 0 chunk(s) (failed, 2 dropped)"));
    }

    #[test]
    fn test_summary_display() {
        let temp = TempDir::new().unwrap();
        let exporter =
            PartitionedExporter::new(temp.path(), "ds", ExportFormat::Csv, headers(), 1024);
        assert_eq!(exporter.finalize().to_string(), "ds: no rows");
    }
}
