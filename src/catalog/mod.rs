//! Marketplace catalog data model
//!
//! Items arrive as loosely typed JSON. This module decodes the handful of fields
//! the scanner relies on and keeps everything else so callers see the raw item.

mod item;

pub use item::{CatalogItem, CatalogPage, ItemEnvelope};
