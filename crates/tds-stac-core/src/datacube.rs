//! Datacube extension payload: named dimensions and variables.
//!
//! THREDDS ISO documents describe grid dimensions only by name, so the
//! mapping from name to axis is fixed:
//!
//! | Dimension name | Type | Axis | Extent |
//! |----------------|------|------|--------|
//! | `row` | spatial | `x` | `[west, east]` |
//! | `column` | spatial | `y` | `[south, north]` |
//! | anything else | temporal | `time` | `[begin, end]` |
//!
//! The table is not extensible: a vertical or spectral dimension is reported
//! as temporal.
//!
//! `reference_system` (`epsg:4326`) is written on the two spatial dimensions
//! only; temporal dimensions carry none.

use serde::{Deserialize, Serialize};

use crate::models::BoundingBox;
use crate::CoreError;

/// Reference system written on spatial dimensions.
pub const REFERENCE_SYSTEM: &str = "epsg:4326";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Spatial,
    Temporal,
}

/// Role a dimension plays, derived from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionRole {
    Longitude,
    Latitude,
    Time,
}

impl DimensionRole {
    pub fn from_name(name: &str) -> Self {
        match name {
            "row" => DimensionRole::Longitude,
            "column" => DimensionRole::Latitude,
            _ => DimensionRole::Time,
        }
    }

    pub fn axis(&self) -> &'static str {
        match self {
            DimensionRole::Longitude => "x",
            DimensionRole::Latitude => "y",
            DimensionRole::Time => "time",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DimensionRole::Longitude => "longitude",
            DimensionRole::Latitude => "latitude",
            DimensionRole::Time => "time",
        }
    }

    pub fn dimension_type(&self) -> DimensionType {
        match self {
            DimensionRole::Longitude | DimensionRole::Latitude => DimensionType::Spatial,
            DimensionRole::Time => DimensionType::Temporal,
        }
    }
}

/// Extent of a dimension: numeric for spatial axes, ISO 8601 strings for time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extent {
    Spatial([f64; 2]),
    Temporal([String; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    pub axis: String,
    pub description: String,
    pub extent: Extent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_system: Option<String>,
}

impl Dimension {
    /// Build the descriptor for dimension `name`.
    ///
    /// Fails only for a temporal dimension when the begin or end position
    /// is unknown.
    pub fn classify(
        name: &str,
        bbox: &BoundingBox,
        begin: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, CoreError> {
        let role = DimensionRole::from_name(name);
        let (extent, reference_system) = match role {
            DimensionRole::Longitude => (
                Extent::Spatial([bbox.west, bbox.east]),
                Some(REFERENCE_SYSTEM.to_string()),
            ),
            DimensionRole::Latitude => (
                Extent::Spatial([bbox.south, bbox.north]),
                Some(REFERENCE_SYSTEM.to_string()),
            ),
            DimensionRole::Time => match (begin, end) {
                (Some(b), Some(e)) => (Extent::Temporal([b.to_string(), e.to_string()]), None),
                _ => return Err(CoreError::TemporalExtentMissing(name.to_string())),
            },
        };

        Ok(Self {
            dimension_type: role.dimension_type(),
            axis: role.axis().to_string(),
            description: role.description().to_string(),
            extent,
            reference_system,
        })
    }
}

/// A data variable and the dimensions it spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "type")]
    pub variable_type: String,
    pub description: String,
    pub dimensions: Vec<String>,
}

impl Variable {
    pub fn data(description: impl Into<String>, dimensions: Vec<String>) -> Self {
        Self {
            variable_type: "data".to_string(),
            description: description.into(),
            dimensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(-10.0, 30.0, 10.0, 50.0)
    }

    #[test]
    fn row_is_longitude() {
        let d = Dimension::classify("row", &bbox(), None, None).unwrap();
        assert_eq!(d.axis, "x");
        assert_eq!(d.dimension_type, DimensionType::Spatial);
        assert_eq!(d.extent, Extent::Spatial([-10.0, 10.0]));
        assert_eq!(d.reference_system.as_deref(), Some(REFERENCE_SYSTEM));
    }

    #[test]
    fn column_is_latitude() {
        let d = Dimension::classify("column", &bbox(), None, None).unwrap();
        assert_eq!(d.axis, "y");
        assert_eq!(d.description, "latitude");
        assert_eq!(d.extent, Extent::Spatial([30.0, 50.0]));
    }

    #[test]
    fn other_names_are_temporal() {
        for name in ["time", "height", "band"] {
            let d = Dimension::classify(
                name,
                &bbox(),
                Some("2000-01-01T00:00:00Z"),
                Some("2001-01-01T00:00:00Z"),
            )
            .unwrap();
            assert_eq!(d.axis, "time");
            assert_eq!(d.dimension_type, DimensionType::Temporal);
            assert_eq!(
                d.extent,
                Extent::Temporal([
                    "2000-01-01T00:00:00Z".to_string(),
                    "2001-01-01T00:00:00Z".to_string()
                ])
            );
            assert!(d.reference_system.is_none());
        }
    }

    #[test]
    fn temporal_without_positions_fails() {
        let err = Dimension::classify("time", &bbox(), Some("2000"), None).unwrap_err();
        assert!(matches!(err, CoreError::TemporalExtentMissing(ref n) if n == "time"));
    }

    #[test]
    fn extent_serializes_untagged() {
        let d = Dimension::classify("row", &bbox(), None, None).unwrap();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["extent"], serde_json::json!([-10.0, 10.0]));
        assert_eq!(json["type"], "spatial");
    }
}
