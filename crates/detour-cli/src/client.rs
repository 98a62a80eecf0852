//! HTTP client for the Detour server API.

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use detour_core::{BoundingBox, IngestSummary, LatLng, PathResult};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NetworkStats {
    pub nodes: i64,
    pub edges: i64,
}

/// Client for a running Detour server.
pub struct DetourClient {
    base_url: String,
    client: reqwest::Client,
}

impl DetourClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request a route; `Ok(None)` when the server finds no connection.
    pub async fn route(&self, start: LatLng, end: LatLng) -> Result<Option<PathResult>> {
        let response = self
            .client
            .post(self.url("/v1/route"))
            .json(&route_request_body(start, end))
            .send()
            .await
            .context("route request failed")?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(
                response.json().await.context("invalid route response")?,
            )),
            status => bail!("route request rejected ({}): {}", status, error_text(response).await),
        }
    }

    pub async fn ingest(&self, bbox: &BoundingBox) -> Result<IngestSummary> {
        let response = self
            .client
            .post(self.url("/v1/network/ingest"))
            .json(bbox)
            .send()
            .await
            .context("ingest request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("ingest request rejected ({}): {}", status, error_text(response).await);
        }
        response.json().await.context("invalid ingest response")
    }

    pub async fn stats(&self) -> Result<NetworkStats> {
        let response = self
            .client
            .get(self.url("/v1/network/stats"))
            .send()
            .await
            .context("stats request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("stats request rejected ({}): {}", status, error_text(response).await);
        }
        response.json().await.context("invalid stats response")
    }
}

pub fn route_request_body(start: LatLng, end: LatLng) -> Value {
    json!({
        "start": { "lat": start.lat, "lng": start.lng },
        "end": { "lat": end.lat, "lng": end.lng },
    })
}

async fn error_text(response: reqwest::Response) -> String {
    match response.json::<Value>().await {
        Ok(body) => body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => "no error details".to_string(),
    }
}
