//! Loader trait for loading data to destinations

use eyre::Result;

/// Loader trait for loading data to a destination
///
/// Implementors define how items reach their destination:
/// - Chunked CSV partitions
/// - Newline-delimited JSON manifests
///
/// Loaders are stateful (open files, byte budgets), so `load` takes
/// `&mut self`. A `&mut` reference to a loader is itself a loader, which lets
/// several pipelines feed one destination in turn.
pub trait Loader {
    /// The type of items to load
    type Item;

    /// Load a batch of items to the destination
    ///
    /// Returns the number of items accepted
    ///
    /// # Errors
    /// Returns an error if loading fails in a way the whole run cannot
    /// recover from
    fn load(&mut self, items: Vec<Self::Item>) -> Result<usize>;
}

impl<L: Loader + ?Sized> Loader for &mut L {
    type Item = L::Item;

    fn load(&mut self, items: Vec<Self::Item>) -> Result<usize> {
        (**self).load(items)
    }
}
