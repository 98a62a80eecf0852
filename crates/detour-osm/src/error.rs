use thiserror::Error;

#[derive(Debug, Error)]
pub enum OsmError {
    #[error("map data request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("map data provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed map data payload: {0}")]
    MalformedPayload(String),

    #[error("way {way_id} references node {node_id} missing from the payload")]
    UnknownNode { way_id: i64, node_id: i64 },
}

impl OsmError {
    /// Transport and HTTP status failures may succeed when repeated; payload
    /// problems will not.
    pub fn is_transient(&self) -> bool {
        match self {
            OsmError::Request(_) => true,
            OsmError::Status { status, .. } => *status == 429 || *status >= 500,
            OsmError::MalformedPayload(_) | OsmError::UnknownNode { .. } => false,
        }
    }
}

impl From<serde_json::Error> for OsmError {
    fn from(err: serde_json::Error) -> Self {
        OsmError::MalformedPayload(err.to_string())
    }
}
