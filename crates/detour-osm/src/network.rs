//! Overpass payload model and its reduction to routable road segments.

use std::collections::HashMap;

use serde::Deserialize;

use detour_core::spatial::haversine_distance;

use crate::error::OsmError;

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Road classification derived from the `highway` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Residential,
    Service,
    Track,
    Other,
}

impl RoadClass {
    pub fn from_highway(tag: Option<&str>) -> Self {
        match tag {
            Some("motorway") => RoadClass::Motorway,
            Some("trunk") => RoadClass::Trunk,
            Some("primary") => RoadClass::Primary,
            Some("residential") => RoadClass::Residential,
            Some("service") => RoadClass::Service,
            Some("track") => RoadClass::Track,
            _ => RoadClass::Other,
        }
    }

    /// Persisted penalty for edges of this class. Major roads are cheaper to
    /// traverse than their length suggests, minor ones dearer.
    pub fn cost_factor(self) -> f64 {
        match self {
            RoadClass::Motorway | RoadClass::Trunk => 0.8,
            RoadClass::Primary => 0.9,
            RoadClass::Residential => 1.2,
            RoadClass::Service | RoadClass::Track => 1.5,
            RoadClass::Other => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawNode {
    pub osm_id: i64,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawWay {
    pub id: i64,
    pub node_ids: Vec<i64>,
    pub tags: HashMap<String, String>,
}

impl RawWay {
    pub fn highway(&self) -> Option<&str> {
        self.tags.get("highway").map(String::as_str)
    }

    pub fn road_class(&self) -> RoadClass {
        RoadClass::from_highway(self.highway())
    }

    /// Only an explicit `oneway=yes` restricts travel to the drawing direction.
    pub fn is_oneway(&self) -> bool {
        self.tags.get("oneway").map(String::as_str) == Some("yes")
    }

    pub fn is_routable(&self) -> bool {
        self.node_ids.len() >= 2
    }
}

/// One consecutive node pair of a way, ready to be written as edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadSegment {
    pub way_id: i64,
    pub from: RawNode,
    pub to: RawNode,
    pub distance_m: f64,
    pub penalty: f64,
    pub oneway: bool,
}

/// Provider payload split into a node lookup table and the list of ways.
#[derive(Debug, Clone, Default)]
pub struct RawRoadNetwork {
    pub nodes: HashMap<i64, RawNode>,
    pub ways: Vec<RawWay>,
}

impl RawRoadNetwork {
    pub fn from_json(body: &str) -> Result<Self, OsmError> {
        let response: OverpassResponse = serde_json::from_str(body)?;
        Self::from_response(response)
    }

    pub fn from_response(response: OverpassResponse) -> Result<Self, OsmError> {
        let mut network = RawRoadNetwork::default();
        for element in response.elements {
            match element.kind.as_str() {
                "node" => {
                    let (Some(lat), Some(lng)) = (element.lat, element.lon) else {
                        return Err(OsmError::MalformedPayload(format!(
                            "node {} has no coordinates",
                            element.id
                        )));
                    };
                    network.nodes.insert(
                        element.id,
                        RawNode {
                            osm_id: element.id,
                            lat,
                            lng,
                        },
                    );
                }
                "way" => network.ways.push(RawWay {
                    id: element.id,
                    node_ids: element.nodes,
                    tags: element.tags,
                }),
                _ => {}
            }
        }
        Ok(network)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Consecutive node pairs of `way` with their great-circle length.
    ///
    /// Pairs that repeat the same coordinates are dropped; a node id missing
    /// from the payload fails the whole way.
    pub fn segments(&self, way: &RawWay) -> Result<Vec<RoadSegment>, OsmError> {
        let penalty = way.road_class().cost_factor();
        let oneway = way.is_oneway();
        let mut segments = Vec::with_capacity(way.node_ids.len().saturating_sub(1));

        for pair in way.node_ids.windows(2) {
            let from = self.lookup(way.id, pair[0])?;
            let to = self.lookup(way.id, pair[1])?;
            let distance_m = haversine_distance(from.lat, from.lng, to.lat, to.lng);
            if !(distance_m > 0.0) {
                continue;
            }
            segments.push(RoadSegment {
                way_id: way.id,
                from,
                to,
                distance_m,
                penalty,
                oneway,
            });
        }
        Ok(segments)
    }

    fn lookup(&self, way_id: i64, node_id: i64) -> Result<RawNode, OsmError> {
        self.nodes
            .get(&node_id)
            .copied()
            .ok_or(OsmError::UnknownNode { way_id, node_id })
    }
}
