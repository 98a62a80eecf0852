pub mod error;
pub mod graph;
pub mod hazard;
pub mod models;
pub mod search;
pub mod spatial;

pub use error::GeoError;
pub use graph::{Link, RoadGraph};
pub use hazard::{
    apply_hazards, severity_multiplier, EdgeCostMap, HazardImpact, HazardSource,
    DEFAULT_HAZARD_RADIUS_M,
};
pub use models::{
    BoundingBox, EdgeId, GraphEdge, GraphNode, Hazard, IngestSummary, LatLng, NodeId, PathResult,
};
pub use search::{
    assemble_path, bidirectional_search, find_route, RouteSearchConfig, SearchOutcome,
    SearchStats, DEFAULT_AVERAGE_SPEED_KMH,
};
pub use spatial::{bbox_around, haversine_distance, nearest_node, pad_bbox};
