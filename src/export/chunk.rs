//! Size-bounded chunk files for one partition

use super::ExportFormat;
use crate::identity::ObjectType;

use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A closed chunk file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

/// Final state of one (dataset, object type) partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub object_type: ObjectType,
    pub chunks: Vec<ChunkInfo>,
    /// Set when a write failed; later rows of the partition were dropped
    pub failed: bool,
    pub dropped: usize,
}

impl PartitionSummary {
    pub fn rows(&self) -> usize {
        self.chunks.iter().map(|c| c.rows).sum()
    }
}

struct OpenChunk {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes: u64,
    rows: usize,
}

/// Writes one partition as `{dataset}_{type}_chunk{N}.{ext}` files
///
/// A chunk never grows past `max_bytes` (header included) unless a single
/// row is larger than the budget, in which case that row sits alone in its
/// chunk. Chunks are numbered from 1 and only created when a row arrives;
/// an existing file with the same name is truncated.
pub struct ChunkWriter {
    dir: PathBuf,
    dataset: String,
    object_type: ObjectType,
    format: ExportFormat,
    headers: Vec<String>,
    max_bytes: u64,
    current: Option<OpenChunk>,
    closed: Vec<ChunkInfo>,
}

impl ChunkWriter {
    pub fn new(
        dir: impl AsRef<Path>,
        dataset: &str,
        object_type: ObjectType,
        format: ExportFormat,
        headers: Vec<String>,
        max_bytes: u64,
    ) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            dataset: dataset.to_string(),
            object_type,
            format,
            headers,
            max_bytes,
            current: None,
            closed: Vec::new(),
        }
    }

    /// Path of chunk `number` of this partition
    pub fn chunk_path(&self, number: usize) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_chunk{}.{}",
            self.dataset,
            self.object_type.partition_name(),
            number,
            self.format.extension()
        ))
    }

    /// Append one row, rolling over to a new chunk when the budget is hit
    pub fn write(&mut self, values: &[String]) -> Result<()> {
        let row = self.format.encode_row(&self.headers, values)?;
        let row_bytes = row.len() as u64;

        if let Some(chunk) = &self.current
            && chunk.rows > 0
            && chunk.bytes + row_bytes > self.max_bytes
        {
            self.close_current()?;
        }

        let mut chunk = match self.current.take() {
            Some(chunk) => chunk,
            None => self.open_chunk()?,
        };

        chunk
            .writer
            .write_all(&row)
            .with_context(|| format!("Failed to write row to {}", chunk.path.display()))?;
        chunk.bytes += row_bytes;
        chunk.rows += 1;
        self.current = Some(chunk);
        Ok(())
    }

    fn open_chunk(&self) -> Result<OpenChunk> {
        let path = self.chunk_path(self.closed.len() + 1);
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))?;
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        let header = self.format.encode_header(&self.headers)?;
        writer
            .write_all(&header)
            .with_context(|| format!("Failed to write header to {}", path.display()))?;

        log::debug!("Opened {}", path.display());
        Ok(OpenChunk {
            path,
            writer,
            bytes: header.len() as u64,
            rows: 0,
        })
    }

    fn close_current(&mut self) -> Result<()> {
        let Some(mut chunk) = self.current.take() else {
            return Ok(());
        };
        chunk
            .writer
            .flush()
            .with_context(|| format!("Failed to flush {}", chunk.path.display()))?;

        log::info!(
            "Wrote {} row(s), {} bytes to {}",
            chunk.rows.cyan(),
            chunk.bytes,
            chunk.path.display().bright_black()
        );
        self.closed.push(ChunkInfo {
            path: chunk.path,
            rows: chunk.rows,
            bytes: chunk.bytes,
        });
        Ok(())
    }

    /// Flush and close the open chunk
    pub fn finalize(mut self) -> Result<PartitionSummary> {
        self.close_current()?;
        Ok(PartitionSummary {
            object_type: self.object_type,
            chunks: self.closed,
            failed: false,
            dropped: 0,
        })
    }

    /// Summary of what reached disk, for a partition abandoned after a failure
    pub fn abandon(mut self, dropped: usize) -> PartitionSummary {
        if let Err(e) = self.close_current() {
            log::warn!("{}", e);
        }
        PartitionSummary {
            object_type: self.object_type,
            chunks: self.closed,
            failed: true,
            dropped,
        }
    }
}
