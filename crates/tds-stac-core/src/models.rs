//! STAC data models produced by the harvester.
//!
//! These types serialize to STAC 1.0.0 JSON. Only the fields the harvester
//! actually fills are modelled; everything else is left to downstream tools.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::datacube::{Dimension, Variable};

/// STAC specification version written into every object.
pub const STAC_VERSION: &str = "1.0.0";

/// Schema URI of the datacube extension.
pub const DATACUBE_EXTENSION: &str =
    "https://stac-extensions.github.io/datacube/v2.2.0/schema.json";

/// Media types used for assets and links.
pub mod media_type {
    pub const XML: &str = "application/xml";
    pub const HTML: &str = "text/html";
    pub const TEXT: &str = "text/plain";
    pub const NETCDF: &str = "application/netcdf";
    pub const JSON: &str = "application/json";
    pub const GEOJSON: &str = "application/geo+json";
}

/// Axis-aligned bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// `[west, south, east, north]`, the STAC `bbox` order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Polygon corners in the order (W,S), (W,N), (E,N), (E,S).
    pub fn vertices(&self) -> [[f64; 2]; 4] {
        [
            [self.west, self.south],
            [self.west, self.north],
            [self.east, self.north],
            [self.east, self.south],
        ]
    }

    /// Rectangular footprint with a closed exterior ring.
    pub fn to_geometry(&self) -> Geometry {
        let mut ring = self.vertices().to_vec();
        ring.push(ring[0]);
        Geometry::Polygon {
            coordinates: vec![ring],
        }
    }
}

/// GeoJSON geometry. Items only ever carry rectangular footprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    /// Exterior ring without the closing vertex.
    pub fn exterior(&self) -> &[[f64; 2]] {
        match self {
            Geometry::Polygon { coordinates } => match coordinates.first() {
                Some(ring) if ring.len() > 1 && ring.first() == ring.last() => {
                    &ring[..ring.len() - 1]
                }
                Some(ring) => ring,
                None => &[],
            },
        }
    }
}

/// A link between STAC objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            title: None,
        }
    }

    pub fn json(mut self) -> Self {
        self.media_type = Some(media_type::JSON.to_string());
        self
    }

    pub fn geojson(mut self) -> Self {
        self.media_type = Some(media_type::GEOJSON.to_string());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A data-access endpoint attached to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Asset {
    pub fn new(href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: media_type.into(),
            title: None,
            roles: Vec::new(),
        }
    }
}

/// Item properties: acquisition time plus the datacube payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    #[serde(serialize_with = "serialize_datetime")]
    pub datetime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "cube:dimensions", default)]
    pub dimensions: BTreeMap<String, Dimension>,
    #[serde(rename = "cube:variables", default)]
    pub variables: BTreeMap<String, Variable>,
}

/// A STAC Item describing one THREDDS dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub object_type: String,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Geometry,
    pub bbox: [f64; 4],
    pub properties: ItemProperties,
    #[serde(default)]
    pub links: Vec<Link>,
    pub assets: BTreeMap<String, Asset>,
}

impl Item {
    /// Create an item whose footprint is `bbox`.
    pub fn new(id: impl Into<String>, bbox: BoundingBox, datetime: DateTime<Utc>) -> Self {
        Self {
            object_type: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: Vec::new(),
            id: id.into(),
            geometry: bbox.to_geometry(),
            bbox: bbox.to_array(),
            properties: ItemProperties {
                datetime,
                title: None,
                dimensions: BTreeMap::new(),
                variables: BTreeMap::new(),
            },
            links: Vec::new(),
            assets: BTreeMap::new(),
        }
    }

    /// Insert an asset; a later asset with the same key replaces the earlier one.
    pub fn add_asset(&mut self, key: impl Into<String>, asset: Asset) {
        self.assets.insert(key.into(), asset);
    }

    /// Apply the datacube extension and register its schema.
    pub fn apply_datacube(
        &mut self,
        dimensions: BTreeMap<String, Dimension>,
        variables: BTreeMap<String, Variable>,
    ) {
        self.properties.dimensions = dimensions;
        self.properties.variables = variables;
        if !self.stac_extensions.iter().any(|e| e == DATACUBE_EXTENSION) {
            self.stac_extensions.push(DATACUBE_EXTENSION.to_string());
        }
    }
}

/// Serialized form of a catalog node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "type")]
    pub object_type: String,
    pub stac_version: String,
    pub id: String,
    pub description: String,
    pub links: Vec<Link>,
}

impl Catalog {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            object_type: "Catalog".to_string(),
            stac_version: STAC_VERSION.to_string(),
            id: id.into(),
            description: description.into(),
            links: Vec::new(),
        }
    }
}

fn serialize_datetime<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn vertices_follow_ws_wn_en_es() {
        let bbox = BoundingBox::new(-10.0, 30.0, 10.0, 50.0);
        assert_eq!(
            bbox.vertices(),
            [[-10.0, 30.0], [-10.0, 50.0], [10.0, 50.0], [10.0, 30.0]]
        );
    }

    #[test]
    fn geometry_ring_is_closed() {
        let geom = BoundingBox::new(1.0, 2.0, 3.0, 4.0).to_geometry();
        let Geometry::Polygon { coordinates } = &geom;
        assert_eq!(coordinates[0].len(), 5);
        assert_eq!(coordinates[0][0], coordinates[0][4]);
        assert_eq!(geom.exterior().len(), 4);
    }

    #[test]
    fn item_serializes_as_feature() {
        let dt = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let mut item = Item::new("ds-1", BoundingBox::new(-10.0, 30.0, 10.0, 50.0), dt);
        item.add_asset("wms", Asset::new("https://x/wms/a.nc", media_type::XML));
        item.apply_datacube(BTreeMap::new(), BTreeMap::new());

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["type"], "Polygon");
        assert_eq!(json["bbox"], serde_json::json!([-10.0, 30.0, 10.0, 50.0]));
        assert_eq!(json["properties"]["datetime"], "2020-01-02T03:04:05Z");
        assert_eq!(json["assets"]["wms"]["type"], "application/xml");
        assert_eq!(json["stac_extensions"][0], DATACUBE_EXTENSION);
    }

    #[test]
    fn datacube_extension_registered_once() {
        let dt = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut item = Item::new("a", BoundingBox::new(0.0, 0.0, 1.0, 1.0), dt);
        item.apply_datacube(BTreeMap::new(), BTreeMap::new());
        item.apply_datacube(BTreeMap::new(), BTreeMap::new());
        assert_eq!(item.stac_extensions.len(), 1);
    }
}
