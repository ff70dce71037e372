//! Identity resolution foundations
//!
//! - [`EntityPrefix`] / [`ObjectType`]: the closed set of identifier kinds
//!   and the destination object each one migrates to
//! - [`MappingSource`]: descriptor of one mapping table
//! - [`IdentityIndex`]: the per-run lookup built from those tables

mod index;
mod mapping;
mod prefix;

pub use index::{IdentityIndex, SourceLoad};
pub use mapping::{DEFAULT_DESTINATION_COLUMN, MappingSource};
pub use prefix::{EntityPrefix, ObjectType};
