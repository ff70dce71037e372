//! Pipeline orchestration for streaming ETL runs

use super::{Extractor, Loader, Transformer};
use eyre::Result;

/// Counters gathered while a pipeline runs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Records pulled from the source
    pub read: usize,
    /// Records the source could not decode
    pub unreadable: usize,
    /// Records whose transformation returned an error
    pub failed: usize,
    /// Records that produced no output rows (filtered or unresolved)
    pub skipped: usize,
    /// Output rows produced by the transformer
    pub emitted: usize,
    /// Output rows accepted by the loader
    pub loaded: usize,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "read {}, skipped {}, failed {}, unreadable {}, emitted {}, loaded {}",
            self.read, self.skipped, self.failed, self.unreadable, self.emitted, self.loaded
        )
    }
}

/// Streaming ETL pipeline
///
/// Pulls one record at a time from the extractor, transforms it into zero or
/// more output rows (fan-out) and hands them straight to the loader.
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `T`: Transformer type (turns one `E::Item` into a `Vec` of loader items)
/// - `L`: Loader type
///
/// A record that cannot be decoded or transformed is logged and skipped; the
/// run only fails when the source cannot be opened or the loader fails.
///
/// # Example
/// ```
/// use crm_migrator::etl::{Extractor, Loader, Pipeline, Transformer};
/// use eyre::Result;
///
/// struct Source;
/// impl Extractor for Source {
///     type Item = i32;
///     type Stream = std::vec::IntoIter<Result<i32>>;
///     fn extract(&self) -> Result<Self::Stream> {
///         Ok(vec![Ok(1), Ok(2), Ok(3)].into_iter())
///     }
/// }
///
/// struct EvenTwice;
/// impl Transformer for EvenTwice {
///     type Input = i32;
///     type Output = Vec<i32>;
///     fn transform(&self, n: i32) -> Result<Vec<i32>> {
///         Ok(if n % 2 == 0 { vec![n, n] } else { vec![] })
///     }
/// }
///
/// #[derive(Default)]
/// struct Collect(Vec<i32>);
/// impl Loader for Collect {
///     type Item = i32;
///     fn load(&mut self, items: Vec<i32>) -> Result<usize> {
///         let n = items.len();
///         self.0.extend(items);
///         Ok(n)
///     }
/// }
///
/// let mut sink = Collect::default();
/// let stats = Pipeline::new(Source, EvenTwice, &mut sink).run().unwrap();
/// assert_eq!(stats.skipped, 2);
/// assert_eq!(sink.0, vec![2, 2]);
/// ```
pub struct Pipeline<E, T, L> {
    extractor: E,
    transformer: T,
    loader: L,
}

impl<E, T, L> Pipeline<E, T, L>
where
    E: Extractor,
    T: Transformer<Input = E::Item, Output = Vec<L::Item>>,
    L: Loader,
{
    /// Create a new pipeline
    pub fn new(extractor: E, transformer: T, loader: L) -> Self {
        Self {
            extractor,
            transformer,
            loader,
        }
    }

    /// Run the pipeline to completion
    ///
    /// # Errors
    /// Returns an error if the source cannot be opened or the loader fails
    pub fn run(&mut self) -> Result<PipelineStats> {
        log::debug!("Starting ETL pipeline");
        let mut stats = PipelineStats::default();

        for item in self.extractor.extract()? {
            stats.read += 1;

            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    log::warn!("Skipping unreadable record #{}: {}", stats.read, e);
                    stats.unreadable += 1;
                    continue;
                }
            };

            let rows = match self.transformer.transform(item) {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("Error processing record #{}: {}. Skipping.", stats.read, e);
                    stats.failed += 1;
                    continue;
                }
            };

            if rows.is_empty() {
                stats.skipped += 1;
                continue;
            }

            stats.emitted += rows.len();
            stats.loaded += self.loader.load(rows)?;
        }

        log::debug!("Pipeline complete: {}", stats);
        Ok(stats)
    }

    /// Give the loader back once the run is over
    pub fn into_loader(self) -> L {
        self.loader
    }
}
