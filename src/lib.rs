//! # tds2stac
//!
//! Harvests a THREDDS Data Server catalog hierarchy into a STAC catalog.
//!
//! Starting from a root THREDDS catalog, the crawler follows every
//! `catalogRef`, mirrors each THREDDS catalog as a STAC catalog, and turns
//! each leaf dataset into a STAC item whose footprint, time range, and
//! variables come from the dataset's ISO 19115 metadata. Items carry one
//! asset per access service and the datacube extension.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌────────────┐   ┌───────────┐
//! │  Fetcher  │──▶│    crawl     │──▶│  metadata  │──▶│ assemble  │
//! │ HTTP/mem  │   │ count/build  │   │  ISO 19115 │   │ STAC item │
//! └───────────┘   └──────┬───────┘   └────────────┘   └─────┬─────┘
//!                        │          CatalogTree             │
//!                        └──────────────▶◀──────────────────┘
//!                                       │
//!                                  ┌────▼────┐
//!                                  │ writer  │
//!                                  └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tds2stac count https://tds.example.org/thredds/catalog/regclim/catalog.html
//! tds2stac harvest https://tds.example.org/thredds/catalog/regclim/catalog.html --out ./stac
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Recoverable error taxonomy |
//! | [`fetch`] | Document fetching (HTTP and in-memory) |
//! | [`xml`] | Namespace-aware element tree |
//! | [`thredds`] | THREDDS catalog and detail documents |
//! | [`urls`] | URL normalization and resolution |
//! | [`metadata`] | Per-dataset ISO metadata extraction |
//! | [`assemble`] | STAC item assembly |
//! | [`crawl`] | Counter and build passes |
//! | [`progress`] | Progress reporting on stderr |
//! | [`writer`] | Self-contained catalog on disk |
//! | [`harvest`] | CLI command orchestration |

pub mod assemble;
pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod harvest;
pub mod metadata;
pub mod progress;
pub mod thredds;
pub mod urls;
pub mod writer;
pub mod xml;
