//! Validation errors for geographic inputs.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("invalid bounding box [{min_lat}, {min_lng}, {max_lat}, {max_lng}]")]
    InvalidBoundingBox {
        min_lat: f64,
        min_lng: f64,
        max_lat: f64,
        max_lng: f64,
    },
}
