//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the trait definitions every migration job is built
//! from: a lazy source, a per-record transformation that may fan out, and a
//! stateful destination.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::{Pipeline, PipelineStats};
pub use transform::Transformer;
