//! Detour OSM - road topology acquisition from OpenStreetMap via Overpass.
//!
//! Turns an Overpass `highway` query into a [`RawRoadNetwork`] whose ways can
//! be reduced to directed, classified road segments.

pub mod client;
pub mod error;
pub mod network;

pub use client::{road_network_query, MapDataProvider, OverpassClient, DEFAULT_OVERPASS_URL};
pub use error::OsmError;
pub use network::{RawNode, RawRoadNetwork, RawWay, RoadClass, RoadSegment};
