//! Overpass API HTTP client.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use detour_core::BoundingBox;

use crate::error::OsmError;
use crate::network::RawRoadNetwork;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_TIMEOUT_S: u64 = 25;

/// Source of raw road topology for a bounding box.
pub trait MapDataProvider: Send + Sync {
    fn fetch_road_network(
        &self,
        bbox: &BoundingBox,
    ) -> impl Future<Output = Result<RawRoadNetwork, OsmError>> + Send;
}

/// Overpass QL selecting every `highway` way in the box plus the nodes those
/// ways reference.
pub fn road_network_query(bbox: &BoundingBox, timeout_s: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_s}];(way[\"highway\"]({},{},{},{}););out body;>;out skel qt;",
        bbox.min_lat, bbox.min_lng, bbox.max_lat, bbox.max_lng
    )
}

/// HTTP client for an Overpass interpreter endpoint.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for OverpassClient {
    fn default() -> Self {
        Self::new(DEFAULT_OVERPASS_URL, Duration::from_secs(DEFAULT_TIMEOUT_S))
    }
}

impl OverpassClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post_query(&self, query: String) -> Result<String, OsmError> {
        let response = self
            .client
            .post(&self.base_url)
            .timeout(self.timeout)
            .form(&[("data", query)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "overpass request rejected");
            return Err(OsmError::Status {
                status: status.as_u16(),
                body: truncate(&body, 256),
            });
        }
        Ok(body)
    }
}

impl MapDataProvider for OverpassClient {
    async fn fetch_road_network(&self, bbox: &BoundingBox) -> Result<RawRoadNetwork, OsmError> {
        let query = road_network_query(bbox, self.timeout.as_secs().max(1));
        debug!(bbox = %bbox.cache_key(), url = %self.base_url, "querying overpass");

        let body = self.post_query(query).await?;
        let network = RawRoadNetwork::from_json(&body)?;

        debug!(
            nodes = network.node_count(),
            ways = network.way_count(),
            "overpass payload decoded"
        );
        Ok(network)
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_selects_highways_in_bbox() {
        let bbox = BoundingBox::new(28.4, 77.0, 28.6, 77.2).unwrap();
        let query = road_network_query(&bbox, 25);
        assert_eq!(
            query,
            "[out:json][timeout:25];(way[\"highway\"](28.4,77,28.6,77.2););out body;>;out skel qt;"
        );
    }

    #[test]
    fn default_client_targets_public_interpreter() {
        let client = OverpassClient::default();
        assert_eq!(client.base_url(), DEFAULT_OVERPASS_URL);
        assert_eq!(client.timeout(), Duration::from_secs(25));
    }

    #[test]
    fn status_errors_classify_retryability() {
        let busy = OsmError::Status {
            status: 429,
            body: String::new(),
        };
        let gone = OsmError::Status {
            status: 404,
            body: String::new(),
        };
        assert!(busy.is_transient());
        assert!(!gone.is_transient());
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_request_error() {
        let client = OverpassClient::new("http://127.0.0.1:9/api/interpreter", Duration::from_secs(2));
        let bbox = BoundingBox::new(0.0, 0.0, 0.001, 0.001).unwrap();
        let err = client.fetch_road_network(&bbox).await.unwrap_err();
        assert!(matches!(err, OsmError::Request(_)), "{err}");
        assert!(err.is_transient());
    }
}
