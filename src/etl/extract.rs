//! Extractor trait for pulling records from a source

use eyre::Result;

/// Extractor trait for lazily pulling items from a source
///
/// Implementors open a source and hand back a stream that yields one item at
/// a time, so a run never holds a whole export in memory:
/// - CSV exports
/// - Manifest partitions
///
/// Opening the stream may fail (missing file, unreadable header); individual
/// items may fail too, and the pipeline decides whether that is fatal.
///
/// # Example
/// ```
/// use crm_migrator::etl::Extractor;
/// use eyre::Result;
///
/// struct Numbers(Vec<i32>);
///
/// impl Extractor for Numbers {
///     type Item = i32;
///     type Stream = std::vec::IntoIter<Result<i32>>;
///
///     fn extract(&self) -> Result<Self::Stream> {
///         Ok(self.0.iter().copied().map(Ok).collect::<Vec<_>>().into_iter())
///     }
/// }
///
/// let total: i32 = Numbers(vec![1, 2, 3])
///     .extract()
///     .unwrap()
///     .map(|n| n.unwrap())
///     .sum();
/// assert_eq!(total, 6);
/// ```
pub trait Extractor {
    /// The type of items extracted
    type Item;

    /// The lazy stream of items
    type Stream: Iterator<Item = Result<Self::Item>>;

    /// Open the source and return its item stream
    ///
    /// # Errors
    /// Returns an error if the source cannot be opened at all
    fn extract(&self) -> Result<Self::Stream>;
}
