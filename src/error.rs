//! Recoverable error taxonomy for the crawl.
//!
//! None of these errors abort a harvest. The crawler logs them and moves on:
//! a failed fetch or parse empties that branch, and a failed extraction or
//! assembly drops that one dataset.

use tds_stac_core::CoreError;

/// A catalog or detail document could not be retrieved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("no document registered for {0}")]
    NotFound(String),
}

/// A document was fetched but is not well-formed XML.
#[derive(Debug, thiserror::Error)]
#[error("malformed XML: {0}")]
pub struct ParseError(pub String);

/// Metadata for one dataset could not be extracted.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("dataset '{0}' not found in detail document")]
    MetadataNotFound(String),
    #[error("bounding box incomplete, missing {}", .missing.join(", "))]
    BoundingBoxIncomplete { missing: Vec<&'static str> },
    #[error("{field} is not a number: '{value}'")]
    InvalidCoordinate { field: &'static str, value: String },
    #[error("dataset has no modified date")]
    DateMissing,
    #[error("unparseable date '{0}'")]
    DateParse(String),
}

/// A STAC item could not be built from extracted metadata.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("variable '{0}' has no matching descriptor")]
    MissingDescriptor(String),
    #[error("cannot resolve service base '{base}': {message}")]
    ServiceUrl { base: String, message: String },
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Why a leaf dataset produced no item.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}
