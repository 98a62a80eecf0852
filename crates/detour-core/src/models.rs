//! Core data models for the routing engine.

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

/// Store-assigned identifier of a graph node.
pub type NodeId = i64;
/// Store-assigned identifier of a graph edge.
pub type EdgeId = i64;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject NaN/infinite values and positions outside the WGS84 range.
    pub fn validate(&self) -> Result<(), GeoError> {
        let in_range = self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng);
        if in_range {
            Ok(())
        } else {
            Err(GeoError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

/// Rectangular lat/lng region used to scope spatial queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Result<Self, GeoError> {
        let bbox = Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        LatLng::new(self.min_lat, self.min_lng).validate()?;
        LatLng::new(self.max_lat, self.max_lng).validate()?;
        if self.min_lat > self.max_lat || self.min_lng > self.max_lng {
            return Err(GeoError::InvalidBoundingBox {
                min_lat: self.min_lat,
                min_lng: self.min_lng,
                max_lat: self.max_lat,
                max_lng: self.max_lng,
            });
        }
        Ok(())
    }

    /// Box spanning two points, padded on every side by `padding_km`.
    ///
    /// One degree is taken as 111 km in both axes, matching the padding used
    /// when deciding whether an area needs ingestion.
    pub fn around(a: LatLng, b: LatLng, padding_km: f64) -> Self {
        let pad = padding_km.max(0.0) / 111.0;
        Self {
            min_lat: (a.lat.min(b.lat) - pad).max(-90.0),
            min_lng: (a.lng.min(b.lng) - pad).max(-180.0),
            max_lat: (a.lat.max(b.lat) + pad).min(90.0),
            max_lng: (a.lng.max(b.lng) + pad).min(180.0),
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }

    /// Stable key for ledgers and log lines (5 decimals, ~1 m).
    pub fn cache_key(&self) -> String {
        format!(
            "{:.5}:{:.5}:{:.5}:{:.5}",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}

/// An intersection or waypoint of the road graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    /// External (OpenStreetMap) id, unique across the store.
    pub osm_id: i64,
    pub lat: f64,
    pub lng: f64,
}

impl GraphNode {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// A directed road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    /// Segment length in meters (> 0).
    pub distance: f64,
    pub base_cost: f64,
    /// Persisted multiplicative cost modifier (road class).
    pub penalty: f64,
}

/// An unresolved hazard report near the routed area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub lat: f64,
    pub lng: f64,
    /// Reported severity; `None` is treated as 1.
    #[serde(default)]
    pub severity: Option<i64>,
}

/// A computed route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResult {
    pub path: Vec<LatLng>,
    /// Meters.
    pub total_distance: f64,
    /// Search cost units (distance scaled by effective penalties).
    pub total_cost: f64,
    /// Minutes at the configured average speed.
    pub estimated_time: f64,
}

/// Outcome of materializing a provider payload into the graph store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Raw nodes carried by the provider payload.
    pub nodes_ingested: usize,
    /// Ways returned by the provider, including ones skipped as too short.
    pub ways_processed: usize,
    /// Directed edges written during this run.
    pub edges_inserted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn around_pads_and_orders_corners() {
        let bbox = BoundingBox::around(LatLng::new(28.6, 77.2), LatLng::new(28.5, 77.0), 1.0);
        assert!(bbox.min_lat < 28.5);
        assert!(bbox.min_lng < 77.0);
        assert!(bbox.max_lat > 28.6);
        assert!(bbox.max_lng > 77.2);

        let reversed =
            BoundingBox::around(LatLng::new(28.5, 77.0), LatLng::new(28.6, 77.2), 1.0);
        assert_eq!(bbox, reversed);
    }

    #[test]
    fn around_grows_with_padding() {
        let point = LatLng::new(28.5, 77.0);
        let small = BoundingBox::around(point, point, 1.0);
        let large = BoundingBox::around(point, point, 5.0);
        let area = |b: &BoundingBox| (b.max_lat - b.min_lat) * (b.max_lng - b.min_lng);
        assert!(area(&large) > area(&small));
    }

    #[test]
    fn inverted_bbox_is_rejected() {
        assert!(BoundingBox::new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn out_of_range_coordinate_is_rejected() {
        assert!(LatLng::new(91.0, 0.0).validate().is_err());
        assert!(LatLng::new(0.0, f64::NAN).validate().is_err());
        assert!(LatLng::new(-33.9, 151.2).validate().is_ok());
    }

    #[test]
    fn path_result_serializes_camel_case() {
        let result = PathResult {
            path: vec![LatLng::new(0.0, 0.0)],
            total_distance: 0.0,
            total_cost: 0.0,
            estimated_time: 0.0,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("totalDistance").is_some());
        assert!(value.get("estimatedTime").is_some());
        assert_eq!(value["path"][0]["lng"], 0.0);
    }
}
