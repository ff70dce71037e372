//! NDJSON (Newline Delimited JSON) file operations

use crate::etl::Extractor;

use eyre::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Read typed NDJSON records from a file
pub struct NdjsonReader<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T: DeserializeOwned> NdjsonReader<T> {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _phantom: PhantomData,
        }
    }

    /// Read all non-blank lines as records
    pub fn read(&self) -> Result<Vec<T>> {
        self.open()?.collect()
    }

    /// Open the file as a lazy stream of records
    pub fn open(&self) -> Result<NdjsonStream<T>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;
        Ok(NdjsonStream {
            lines: BufReader::new(file).lines(),
            line_number: 0,
            _phantom: PhantomData,
        })
    }
}

/// Records of an NDJSON file, one line at a time
///
/// A bad line is reported as its own item.
pub struct NdjsonStream<T> {
    lines: Lines<BufReader<File>>,
    line_number: usize,
    _phantom: PhantomData<T>,
}

impl<T: DeserializeOwned> Iterator for NdjsonStream<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("Failed to read line {}", self.line_number)),
                    );
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).with_context(|| {
                format!("Failed to parse JSON line {}: {}", self.line_number, line)
            }));
        }
    }
}

impl<T: DeserializeOwned> Extractor for NdjsonReader<T> {
    type Item = T;
    type Stream = NdjsonStream<T>;

    fn extract(&self) -> Result<Self::Stream> {
        self.open()
    }
}
