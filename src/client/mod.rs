//! HubSpot API client.
//!
//! This module provides the [`HubSpotClient`] used by the file import, and the
//! [`FileAttacher`] seam the import is written against.

mod hubspot;

pub use hubspot::{DEFAULT_HUBSPOT_URL, FileAttacher, HubSpotClient, note_engagement};
