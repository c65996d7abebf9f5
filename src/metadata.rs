//! Per-dataset metadata extraction.
//!
//! For every leaf dataset the extractor fetches the THREDDS detail document,
//! selects the dataset's access services, and reads the ISO 19139 document
//! published by the `iso` service. ISO elements are recognised by qualified
//! tag through the [`ISO_TAGS`] dispatch table; scalar fields keep the last
//! value seen in document order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tds_stac_core::{BoundingBox, CoreError, Dimension};
use tracing::{debug, warn};

use crate::assemble::service_href;
use crate::error::ExtractError;
use crate::fetch::Fetcher;
use crate::thredds::{ns, DatasetDetail, LeafDataset, Service};
use crate::urls;
use crate::xml::Element;

/// Keywords accepted as variable dimensions.
pub const COORDINATE_NAMES: [&str; 7] = [
    "time",
    "lat",
    "latitude",
    "lon",
    "longitude",
    "long",
    "time_bnds",
];

/// `aName` values that are data types rather than variable names.
pub const DATA_TYPE_TOKENS: [&str; 3] = ["float", "double", "int"];

/// Raw values collected from ISO documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IsoFields {
    pub west: Option<String>,
    pub east: Option<String>,
    pub south: Option<String>,
    pub north: Option<String>,
    pub keywords: Vec<String>,
    pub names: Vec<String>,
    pub descriptors: Vec<String>,
    pub dimension_names: Vec<String>,
    pub begin_position: Option<String>,
    pub end_position: Option<String>,
}

type Setter = fn(&mut IsoFields, &Element);

/// Recognised ISO tags and the field each one feeds.
pub const ISO_TAGS: &[(&str, &str, Setter)] = &[
    (ns::GMD, "westBoundLongitude", set_west),
    (ns::GMD, "eastBoundLongitude", set_east),
    (ns::GMD, "southBoundLatitude", set_south),
    (ns::GMD, "northBoundLatitude", set_north),
    (ns::GMD, "keyword", push_keywords),
    (ns::GCO, "aName", push_names),
    (ns::GMD, "descriptor", push_descriptors),
    (ns::GMD, "dimensionName", push_dimension_names),
    (ns::GML, "beginPosition", set_begin),
    (ns::GML, "endPosition", set_end),
];

fn last_child_text(element: &Element) -> Option<String> {
    element.children.last().map(|c| c.text().to_string())
}

fn child_texts(element: &Element) -> impl Iterator<Item = String> + '_ {
    element.children.iter().map(|c| c.text().to_string())
}

fn own_text(element: &Element) -> Option<String> {
    Some(element.text().to_string()).filter(|t| !t.is_empty())
}

fn set_west(f: &mut IsoFields, e: &Element) {
    if let Some(v) = last_child_text(e) {
        f.west = Some(v);
    }
}

fn set_east(f: &mut IsoFields, e: &Element) {
    if let Some(v) = last_child_text(e) {
        f.east = Some(v);
    }
}

fn set_south(f: &mut IsoFields, e: &Element) {
    if let Some(v) = last_child_text(e) {
        f.south = Some(v);
    }
}

fn set_north(f: &mut IsoFields, e: &Element) {
    if let Some(v) = last_child_text(e) {
        f.north = Some(v);
    }
}

fn push_keywords(f: &mut IsoFields, e: &Element) {
    f.keywords
        .extend(child_texts(e).filter(|t| COORDINATE_NAMES.contains(&t.as_str())));
}

fn push_names(f: &mut IsoFields, e: &Element) {
    f.names
        .extend(child_texts(e).filter(|t| !DATA_TYPE_TOKENS.contains(&t.as_str())));
}

fn push_descriptors(f: &mut IsoFields, e: &Element) {
    f.descriptors.extend(child_texts(e));
}

fn push_dimension_names(f: &mut IsoFields, e: &Element) {
    f.dimension_names.extend(child_texts(e));
}

fn set_begin(f: &mut IsoFields, e: &Element) {
    if let Some(v) = own_text(e) {
        f.begin_position = Some(v);
    }
}

fn set_end(f: &mut IsoFields, e: &Element) {
    if let Some(v) = own_text(e) {
        f.end_position = Some(v);
    }
}

impl IsoFields {
    /// Walk `root` once and feed every recognised element to its setter.
    pub fn ingest(&mut self, root: &Element) {
        for element in root.descendants() {
            for (namespace, name, setter) in ISO_TAGS {
                if element.is(namespace, name) {
                    setter(self, element);
                }
            }
        }
    }

    /// Parse the four bounding-box components.
    pub fn bounding_box(&self) -> Result<BoundingBox, ExtractError> {
        let parts = [
            ("westBoundLongitude", &self.west),
            ("southBoundLatitude", &self.south),
            ("eastBoundLongitude", &self.east),
            ("northBoundLatitude", &self.north),
        ];

        let missing: Vec<&'static str> = parts
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::BoundingBoxIncomplete { missing });
        }

        let mut values = [0.0f64; 4];
        for (slot, (field, value)) in values.iter_mut().zip(parts.iter()) {
            let raw = value.as_deref().unwrap_or_default();
            *slot = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ExtractError::InvalidCoordinate {
                    field: *field,
                    value: raw.to_string(),
                })?;
        }

        Ok(BoundingBox::new(values[0], values[1], values[2], values[3]))
    }
}

/// A variable name and the descriptor at the same position, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    pub name: String,
    pub description: Option<String>,
}

/// Everything needed to assemble one STAC item.
#[derive(Debug, Clone)]
pub struct ExtractedMetadata {
    pub dataset_id: String,
    pub name: Option<String>,
    pub url_path: String,
    /// Catalog URL without query string.
    pub catalog_url: String,
    pub bbox: BoundingBox,
    pub modified: DateTime<Utc>,
    pub begin_position: Option<String>,
    pub end_position: Option<String>,
    /// Coordinate keywords, used as the dimensions of every variable.
    pub keywords: Vec<String>,
    pub variables: Vec<VariableDescriptor>,
    pub dimension_names: Vec<String>,
    /// Access services of the selected compound services.
    pub services: Vec<Service>,
}

impl ExtractedMetadata {
    /// Classify every dimension name, in document order.
    pub fn dimensions(&self) -> Result<Vec<(String, Dimension)>, CoreError> {
        self.dimension_names
            .iter()
            .map(|name| {
                Dimension::classify(
                    name,
                    &self.bbox,
                    self.begin_position.as_deref(),
                    self.end_position.as_deref(),
                )
                .map(|d| (name.clone(), d))
            })
            .collect()
    }
}

/// Fetch and extract metadata for `leaf`, listed in `catalog_url`.
pub async fn extract(
    fetcher: &dyn Fetcher,
    catalog_url: &str,
    leaf: &LeafDataset,
) -> Result<ExtractedMetadata, ExtractError> {
    let catalog_url = urls::strip_query(catalog_url).to_string();
    let detail_url = urls::dataset_detail_url(&catalog_url, &leaf.id);
    let body = fetcher.fetch(&detail_url).await?;
    let root = Element::parse(&body)?;
    extract_from_detail(fetcher, &catalog_url, leaf, &root).await
}

/// Extraction from an already parsed detail document.
pub async fn extract_from_detail(
    fetcher: &dyn Fetcher,
    catalog_url: &str,
    leaf: &LeafDataset,
    root: &Element,
) -> Result<ExtractedMetadata, ExtractError> {
    let detail = DatasetDetail::from_root(root, &leaf.id)
        .ok_or_else(|| ExtractError::MetadataNotFound(leaf.id.clone()))?;

    let modified_text = detail.modified.as_deref().ok_or(ExtractError::DateMissing)?;
    let modified = parse_datetime(modified_text)
        .ok_or_else(|| ExtractError::DateParse(modified_text.to_string()))?;

    let url_path = detail
        .url_path
        .clone()
        .unwrap_or_else(|| leaf.url_path.clone());
    let services: Vec<Service> = detail.access_services().cloned().collect();

    let mut fields = IsoFields::default();
    for service in services.iter().filter(|s| s.name == "iso") {
        let iso_url = match service_href(catalog_url, service, &url_path, &detail.id) {
            Ok(url) => url,
            Err(e) => {
                warn!(dataset = %detail.id, "skipping iso service: {}", e);
                continue;
            }
        };
        debug!(dataset = %detail.id, url = %iso_url, "reading ISO metadata");
        let iso_body = match fetcher.fetch(&iso_url).await {
            Ok(b) => b,
            Err(e) => {
                warn!(dataset = %detail.id, "ISO document unavailable: {}", e);
                continue;
            }
        };
        match Element::parse(&iso_body) {
            Ok(iso_root) => fields.ingest(&iso_root),
            Err(e) => warn!(dataset = %detail.id, url = %iso_url, "ISO document unreadable: {}", e),
        }
    }

    let bbox = fields.bounding_box()?;

    let mut descriptors = fields.descriptors.into_iter();
    let variables = fields
        .names
        .into_iter()
        .map(|name| VariableDescriptor {
            name,
            description: descriptors.next(),
        })
        .collect();

    Ok(ExtractedMetadata {
        dataset_id: detail.id,
        name: detail.name.or_else(|| leaf.name.clone()),
        url_path,
        catalog_url: catalog_url.to_string(),
        bbox,
        modified,
        begin_position: fields.begin_position,
        end_position: fields.end_position,
        keywords: fields.keywords,
        variables,
        dimension_names: fields.dimension_names,
        services,
    })
}

/// Parse a THREDDS date.
///
/// Accepts RFC 3339 and the common `YYYY-MM-DD[ T]HH:MM:SS[.f]` and
/// `YYYY-MM-DD` forms. Values without an offset are taken as UTC. Values
/// with an offset are converted to the same instant in UTC, so
/// `2021-03-04T05:06:07+02:00` becomes `2021-03-04T03:06:07Z` rather than
/// keeping the wall-clock time and relabelling it UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = text.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
