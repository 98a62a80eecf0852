//! Spatial math for distances, radius queries and hazard proximity.

use crate::models::{BoundingBox, GraphNode, LatLng};

/// Mean Earth radius used by every great-circle computation in the engine.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two positions in meters.
pub fn distance_between(a: LatLng, b: LatLng) -> f64 {
    haversine_distance(a.lat, a.lng, b.lat, b.lng)
}

/// Sum of great-circle legs along a polyline.
pub fn polyline_length_m(points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_between(pair[0], pair[1]))
        .sum()
}

/// Closest node to a position by great-circle distance, `None` for an empty slice.
pub fn nearest_node(nodes: &[GraphNode], lat: f64, lng: f64) -> Option<&GraphNode> {
    nodes
        .iter()
        .map(|node| (haversine_distance(lat, lng, node.lat, node.lng), node))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, node)| node)
}

// ==== ENU (East-North-Up) Coordinate Conversion ====
// Latitude-aware scaling between meters and degrees.

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lat(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}

/// Convert an east/west offset in meters to degrees longitude.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lon(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}

/// Convert degrees latitude to meters using local scaling.
pub fn lat_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lat(ref_lat_deg)
}

/// Convert degrees longitude to meters at a given latitude.
pub fn lon_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lon(ref_lat_deg)
}

/// Smallest box guaranteed to contain every point within `radius_m` of the center.
///
/// Used as the coarse prefilter of radius queries; callers refine with
/// [`haversine_distance`]. The box is inflated slightly so the prefilter never
/// drops a point the exact test would keep.
pub fn bbox_around(lat: f64, lng: f64, radius_m: f64) -> BoundingBox {
    grow(lat, lat, lng, lng, lat, radius_m)
}

/// Grow `bbox` by `margin_m` on every side.
///
/// Longitude degrees are sized at the poleward edge, where a metre spans the
/// most longitude, so the margin is at least `margin_m` everywhere.
pub fn pad_bbox(bbox: &BoundingBox, margin_m: f64) -> BoundingBox {
    let poleward = if bbox.min_lat.abs() > bbox.max_lat.abs() {
        bbox.min_lat
    } else {
        bbox.max_lat
    };
    grow(bbox.min_lat, bbox.max_lat, bbox.min_lng, bbox.max_lng, poleward, margin_m)
}

fn grow(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64, ref_lat: f64, margin_m: f64) -> BoundingBox {
    let margin = margin_m.max(0.0) * 1.01;
    let dlat = meters_to_lat(margin, ref_lat);
    // Longitude degrees shrink toward the poles; cap to avoid a degenerate span.
    let dlng = if ref_lat.abs() >= 89.0 {
        180.0
    } else {
        meters_to_lon(margin, ref_lat)
    };
    BoundingBox {
        min_lat: (min_lat - dlat).max(-90.0),
        min_lng: (min_lng - dlng).max(-180.0),
        max_lat: (max_lat + dlat).min(90.0),
        max_lng: (max_lng + dlng).min(180.0),
    }
}

/// Calculate minimum distance from a point to a line segment (in meters).
///
/// Projects into a local ENU frame anchored at the segment start, which is
/// accurate for road-segment lengths.
pub fn distance_to_segment_m(
    point_lat: f64,
    point_lon: f64,
    seg_start_lat: f64,
    seg_start_lon: f64,
    seg_end_lat: f64,
    seg_end_lon: f64,
) -> f64 {
    let ref_lat = seg_start_lat;

    let px = lon_to_meters(point_lon - seg_start_lon, ref_lat);
    let py = lat_to_meters(point_lat - seg_start_lat, ref_lat);

    let sx = lon_to_meters(seg_end_lon - seg_start_lon, ref_lat);
    let sy = lat_to_meters(seg_end_lat - seg_start_lat, ref_lat);

    let seg_len_sq = sx * sx + sy * sy;

    if seg_len_sq < 0.0001 {
        // Degenerate segment
        return (px * px + py * py).sqrt();
    }

    // t = ((P-A) · (B-A)) / |B-A|²
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);

    let dx = px - t * sx;
    let dy = py - t * sy;

    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(28.6139, 77.209, 28.6139, 77.209);
        assert!(dist < 0.001);
    }

    #[test]
    fn haversine_is_symmetric() {
        let ab = haversine_distance(28.6139, 77.209, 28.5, 77.0);
        let ba = haversine_distance(28.5, 77.0, 28.6139, 77.209);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn delhi_to_gurugram_is_tens_of_km() {
        let dist = haversine_distance(28.6139, 77.209, 28.4595, 77.0266);
        assert!(dist > 20_000.0 && dist < 40_000.0);
    }

    #[test]
    fn nearest_node_picks_closest() {
        let nodes = vec![
            GraphNode { id: 1, osm_id: 10, lat: 0.0, lng: 0.0 },
            GraphNode { id: 2, osm_id: 20, lat: 0.0, lng: 0.01 },
        ];
        assert_eq!(nearest_node(&nodes, 0.0, 0.008).map(|n| n.id), Some(2));
        assert_eq!(nearest_node(&nodes, 0.0, 0.001).map(|n| n.id), Some(1));
        assert!(nearest_node(&[], 0.0, 0.0).is_none());
    }

    #[test]
    fn bbox_around_contains_radius() {
        let (lat, lng) = (51.5, -0.12);
        let bbox = bbox_around(lat, lng, 50.0);
        let north = lat + meters_to_lat(50.0, lat);
        let east = lng + meters_to_lon(50.0, lat);
        assert!(bbox.contains(north, lng));
        assert!(bbox.contains(lat, east));
        assert!(!bbox.contains(lat + 0.01, lng));
    }

    #[test]
    fn pad_bbox_grows_every_side() {
        let bbox = BoundingBox::new(51.5, -0.13, 51.51, -0.12).unwrap();
        let padded = pad_bbox(&bbox, 50.0);

        let south = bbox.min_lat - meters_to_lat(50.0, bbox.min_lat);
        let east = bbox.max_lng + meters_to_lon(50.0, bbox.max_lat);
        assert!(padded.contains(south, -0.125));
        assert!(padded.contains(51.505, east));
        assert!(!padded.contains(bbox.max_lat + meters_to_lat(200.0, bbox.max_lat), -0.125));
        assert_eq!(pad_bbox(&bbox, 0.0).cache_key(), bbox.cache_key());
    }

    #[test]
    fn distance_to_segment_midpoint_is_zero() {
        let dist = distance_to_segment_m(0.0, 0.0005, 0.0, 0.0, 0.0, 0.001);
        assert!(dist < 0.01, "got {dist}");
    }

    #[test]
    fn distance_to_segment_clamps_to_endpoint() {
        let dist = distance_to_segment_m(0.0, 0.002, 0.0, 0.0, 0.0, 0.001);
        let expected = haversine_distance(0.0, 0.002, 0.0, 0.001);
        assert!((dist - expected).abs() < 0.5, "got {dist}, expected {expected}");
    }

    #[test]
    fn polyline_length_sums_legs() {
        let points = [
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 0.001),
            LatLng::new(0.001, 0.001),
        ];
        let expected = haversine_distance(0.0, 0.0, 0.0, 0.001)
            + haversine_distance(0.0, 0.001, 0.001, 0.001);
        assert!((polyline_length_m(&points) - expected).abs() < 1e-9);
        assert_eq!(polyline_length_m(&points[..1]), 0.0);
    }
}
