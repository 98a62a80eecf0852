//! Route requests end to end: coverage check, snapping, hazard modulation and
//! the bidirectional search.

use std::time::Duration;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use detour_core::{
    apply_hazards, find_route, nearest_node, pad_bbox, BoundingBox, EdgeCostMap, GeoError, HazardSource,
    IngestSummary, LatLng, PathResult, RoadGraph, RouteSearchConfig,
};
use detour_osm::{MapDataProvider, OverpassClient};

use crate::config::Config;
use crate::ingest::{ingest_network_with_retry, IngestError, RetryPolicy};
use crate::ledger::IngestLedger;
use crate::persistence::graph::{count_nodes_in_bbox, find_edges_in_bbox, find_nodes_in_bbox};
use crate::persistence::SqliteHazardSource;
use crate::workers::{SearchPool, WorkerError};

#[derive(Debug, Error)]
pub enum PathfinderError {
    #[error(transparent)]
    InvalidInput(#[from] GeoError),

    #[error("network ingestion failed: {0}")]
    Ingestion(#[from] IngestError),

    #[error("graph store query failed: {0}")]
    Store(#[from] anyhow::Error),

    #[error("hazard lookup failed: {0}")]
    Hazards(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

#[derive(Debug, Clone)]
pub struct PathfinderSettings {
    pub density_floor: i64,
    pub bbox_padding_km: f64,
    pub hazard_radius_m: f64,
    pub search: RouteSearchConfig,
    pub retry: RetryPolicy,
    pub ingest_cooldown: Duration,
    pub search_workers: usize,
}

impl Default for PathfinderSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PathfinderSettings {
    fn from(config: &Config) -> Self {
        Self {
            density_floor: config.density_floor,
            bbox_padding_km: config.bbox_padding_km,
            hazard_radius_m: config.hazard_radius_m,
            search: config.search_config(),
            retry: RetryPolicy {
                retries: config.ingest_retries,
                backoff_base: Duration::from_millis(config.ingest_retry_backoff_ms),
                ..RetryPolicy::default()
            },
            ingest_cooldown: config.ingest_cooldown(),
            search_workers: config.search_workers,
        }
    }
}

pub struct Pathfinder<P = OverpassClient, H = SqliteHazardSource> {
    pool: SqlitePool,
    provider: P,
    hazards: H,
    settings: PathfinderSettings,
    ledger: IngestLedger,
    workers: SearchPool,
}

impl Pathfinder {
    /// Pathfinder backed by Overpass and the store's own hazard table.
    pub fn from_config(pool: SqlitePool, config: &Config) -> Self {
        let provider = OverpassClient::new(config.overpass_url.clone(), config.overpass_timeout());
        let hazards = SqliteHazardSource::new(pool.clone());
        Self::new(pool, provider, hazards, PathfinderSettings::from(config))
    }
}

impl<P, H> Pathfinder<P, H>
where
    P: MapDataProvider,
    H: HazardSource,
{
    pub fn new(pool: SqlitePool, provider: P, hazards: H, settings: PathfinderSettings) -> Self {
        let ledger = IngestLedger::new(settings.ingest_cooldown);
        let workers = SearchPool::new(settings.search_workers);
        info!(
            workers = workers.size(),
            density_floor = settings.density_floor,
            "pathfinder ready"
        );
        Self {
            pool,
            provider,
            hazards,
            settings,
            ledger,
            workers,
        }
    }

    /// Best route between two positions, `Ok(None)` when none exists.
    ///
    /// May ingest the surrounding area first when the store is too sparse
    /// there. Ingestion failures abort the request.
    pub async fn find_path(
        &self,
        origin_lat: f64,
        origin_lng: f64,
        dest_lat: f64,
        dest_lng: f64,
    ) -> Result<Option<PathResult>, PathfinderError> {
        let origin = LatLng::new(origin_lat, origin_lng);
        let destination = LatLng::new(dest_lat, dest_lng);
        origin.validate()?;
        destination.validate()?;

        let bbox = BoundingBox::around(origin, destination, self.settings.bbox_padding_km);
        self.ensure_coverage(&bbox).await?;

        let nodes = find_nodes_in_bbox(&self.pool, &bbox).await?;
        let (Some(start), Some(end)) = (
            nearest_node(&nodes, origin.lat, origin.lng).map(|node| node.id),
            nearest_node(&nodes, destination.lat, destination.lng).map(|node| node.id),
        ) else {
            info!(bbox = %bbox.cache_key(), "no graph nodes near route endpoints");
            return Ok(None);
        };
        debug!(start, end, nodes = nodes.len(), "snapped route endpoints");

        let edges = find_edges_in_bbox(&self.pool, &bbox).await?;
        // Reports just outside the box still reach edges near its border.
        let radius_m = self.settings.hazard_radius_m;
        let hazards = self
            .hazards
            .list_active_hazards_near(&pad_bbox(&bbox, radius_m))
            .await
            .map_err(|err| PathfinderError::Hazards(Box::new(err)))?;

        let search = self.settings.search;
        debug!(idle_workers = self.workers.available(), "queueing route search");
        let (result, stats, impact) = self
            .workers
            .run(move || {
                let mut costs = EdgeCostMap::from_edges(&edges);
                let impact = apply_hazards(&nodes, &edges, &hazards, radius_m, &mut costs);
                let graph = RoadGraph::build(nodes, &edges, &costs);
                let (result, stats) = find_route(&graph, start, end, &search);
                (result, stats, impact)
            })
            .await?;

        debug!(
            hazards_applied = impact.hazards_applied,
            edges_penalized = impact.edges_penalized,
            forward_expanded = stats.forward_expanded,
            backward_expanded = stats.backward_expanded,
            "route search complete"
        );
        match &result {
            Some(path) => info!(
                waypoints = path.path.len(),
                distance_m = path.total_distance,
                eta_min = path.estimated_time,
                "route found"
            ),
            None => info!(start, end, "no route between snapped endpoints"),
        }
        Ok(result)
    }

    /// Ingest `bbox` unconditionally and remember it in the ledger.
    pub async fn ingest(&self, bbox: &BoundingBox) -> Result<IngestSummary, IngestError> {
        let summary =
            ingest_network_with_retry(&self.pool, &self.provider, bbox, &self.settings.retry)
                .await?;
        self.ledger.record(bbox, summary);
        Ok(summary)
    }

    async fn ensure_coverage(&self, bbox: &BoundingBox) -> Result<(), PathfinderError> {
        let count = count_nodes_in_bbox(&self.pool, bbox).await?;
        if count >= self.settings.density_floor {
            return Ok(());
        }
        if let Some(record) = self.ledger.covering(bbox) {
            debug!(
                count,
                area = %record.bbox.cache_key(),
                edges = record.summary.edges_inserted,
                "area below density floor but ingested recently"
            );
            return Ok(());
        }

        info!(
            count,
            floor = self.settings.density_floor,
            "area below density floor, ingesting"
        );
        self.ingest(bbox).await.map_err(|err| {
            warn!(error = %err, "ingestion failed");
            PathfinderError::Ingestion(err)
        })?;
        Ok(())
    }
}
