//! # tds-stac core
//!
//! I/O-free building blocks for turning THREDDS catalogs into STAC:
//! the catalog tree registry, STAC item/asset/catalog models, and the
//! datacube extension payload.
//!
//! This crate performs no network or filesystem access. Fetching, XML
//! parsing, and crawling live in the `tds-stac` crate.

pub mod datacube;
pub mod models;
pub mod tree;

pub use datacube::{Dimension, DimensionRole, DimensionType, Extent, Variable};
pub use models::{media_type, Asset, BoundingBox, Catalog, Geometry, Item, Link};
pub use tree::{CatalogNode, CatalogTree, NodeId};

/// Errors raised while building STAC objects.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("temporal dimension '{0}' has no begin/end position")]
    TemporalExtentMissing(String),
}
