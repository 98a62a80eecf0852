//! Network ingestion: provider payload to persisted graph nodes and edges.

use std::collections::HashMap;
use std::time::Duration;

use sqlx::SqlitePool;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use detour_core::{BoundingBox, IngestSummary, NodeId};
use detour_osm::{MapDataProvider, OsmError, RawRoadNetwork, RawNode, RoadSegment};

use crate::backoff::Backoff;
use crate::persistence::graph::{insert_edge, upsert_node};
use crate::persistence::NewEdge;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("map data provider failed: {0}")]
    Provider(#[source] OsmError),

    #[error("malformed map data payload: {0}")]
    MalformedPayload(String),

    #[error("way {way_id} references node {node_id} missing from the payload")]
    UnknownNode { way_id: i64, node_id: i64 },

    #[error("graph store write failed: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<OsmError> for IngestError {
    fn from(err: OsmError) -> Self {
        match err {
            OsmError::MalformedPayload(message) => IngestError::MalformedPayload(message),
            OsmError::UnknownNode { way_id, node_id } => IngestError::UnknownNode { way_id, node_id },
            other => IngestError::Provider(other),
        }
    }
}

/// How often a failed provider call is repeated. Zero retries by default.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
        }
    }
}

/// Fetch the road network for `bbox` and write it to the store.
pub async fn ingest_network<P: MapDataProvider>(
    pool: &SqlitePool,
    provider: &P,
    bbox: &BoundingBox,
) -> Result<IngestSummary, IngestError> {
    ingest_network_with_retry(pool, provider, bbox, &RetryPolicy::default()).await
}

pub async fn ingest_network_with_retry<P: MapDataProvider>(
    pool: &SqlitePool,
    provider: &P,
    bbox: &BoundingBox,
    policy: &RetryPolicy,
) -> Result<IngestSummary, IngestError> {
    info!(bbox = %bbox.cache_key(), "ingesting road network");
    let network = fetch_with_retry(provider, bbox, policy).await?;
    let summary = store_network(pool, &network).await?;
    info!(
        nodes = summary.nodes_ingested,
        ways = summary.ways_processed,
        edges = summary.edges_inserted,
        "road network ingested"
    );
    Ok(summary)
}

async fn fetch_with_retry<P: MapDataProvider>(
    provider: &P,
    bbox: &BoundingBox,
    policy: &RetryPolicy,
) -> Result<RawRoadNetwork, OsmError> {
    let max_attempts = policy.retries.saturating_add(1);
    let mut backoff = Backoff::new(policy.backoff_base, policy.backoff_max);

    let mut attempt = 0;
    loop {
        attempt += 1;
        match provider.fetch_road_network(bbox).await {
            Ok(network) => return Ok(network),
            Err(err) if attempt < max_attempts && err.is_transient() => {
                let delay = backoff.next_delay();
                warn!(attempt, max_attempts, ?delay, error = %err, "map data fetch failed, retrying");
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Materialize a provider payload.
///
/// Every way is reduced to segments before anything is written, so a payload
/// with dangling node references leaves the store untouched. Each way is then
/// written in its own transaction.
pub async fn store_network(
    pool: &SqlitePool,
    network: &RawRoadNetwork,
) -> Result<IngestSummary, IngestError> {
    let mut plan: Vec<Vec<RoadSegment>> = Vec::with_capacity(network.way_count());
    for way in network.ways.iter().filter(|way| way.is_routable()) {
        plan.push(network.segments(way)?);
    }

    let mut summary = IngestSummary {
        nodes_ingested: network.node_count(),
        ways_processed: network.way_count(),
        edges_inserted: 0,
    };
    let mut stored: HashMap<i64, NodeId> = HashMap::new();

    for segments in plan.iter().filter(|segments| !segments.is_empty()) {
        let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;
        let mut pending: HashMap<i64, NodeId> = HashMap::new();

        for segment in segments {
            let from = resolve_node(&mut tx, &stored, &mut pending, &segment.from).await?;
            let to = resolve_node(&mut tx, &stored, &mut pending, &segment.to).await?;

            let forward = NewEdge {
                start_node_id: from,
                end_node_id: to,
                distance: segment.distance_m,
                base_cost: segment.distance_m,
                penalty: segment.penalty,
            };
            insert_edge(&mut *tx, &forward).await?;
            summary.edges_inserted += 1;

            if !segment.oneway {
                let reverse = NewEdge {
                    start_node_id: to,
                    end_node_id: from,
                    ..forward
                };
                insert_edge(&mut *tx, &reverse).await?;
                summary.edges_inserted += 1;
            }
        }

        tx.commit().await.map_err(anyhow::Error::from)?;
        stored.extend(pending);
    }

    Ok(summary)
}

async fn resolve_node(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    stored: &HashMap<i64, NodeId>,
    pending: &mut HashMap<i64, NodeId>,
    node: &RawNode,
) -> anyhow::Result<NodeId> {
    if let Some(id) = stored.get(&node.osm_id).or_else(|| pending.get(&node.osm_id)) {
        return Ok(*id);
    }
    let row = upsert_node(&mut **tx, node.osm_id, node.lat, node.lng).await?;
    pending.insert(node.osm_id, row.id);
    Ok(row.id)
}
