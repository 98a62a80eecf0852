//! Road graph persistence operations.

use anyhow::Result;
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};

use detour_core::spatial::{bbox_around, haversine_distance, nearest_node as closest};
use detour_core::{BoundingBox, EdgeId, GraphEdge, GraphNode, NodeId};

/// Edge to be written; the store assigns the id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewEdge {
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub distance: f64,
    pub base_cost: f64,
    pub penalty: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub nodes: i64,
    pub edges: i64,
}

/// Insert a node or return the one already stored under `osm_id`.
///
/// A single statement, so concurrent ingestions of overlapping areas agree on
/// one row per `osm_id`. Coordinates of an existing node are left untouched.
pub async fn upsert_node<'e, E>(executor: E, osm_id: i64, lat: f64, lng: f64) -> Result<GraphNode>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, NodeRow>(
        r#"
        INSERT INTO graph_nodes (osm_id, latitude, longitude)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(osm_id) DO UPDATE SET osm_id = excluded.osm_id
        RETURNING id, osm_id, latitude, longitude
        "#,
    )
    .bind(osm_id)
    .bind(lat)
    .bind(lng)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

/// Append a directed edge. Duplicates are accepted.
pub async fn insert_edge<'e, E>(executor: E, edge: &NewEdge) -> Result<EdgeId>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO graph_edges (start_node_id, end_node_id, distance, base_cost, penalty)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(edge.start_node_id)
    .bind(edge.end_node_id)
    .bind(edge.distance)
    .bind(edge.base_cost)
    .bind(edge.penalty)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_nodes_in_bbox(pool: &SqlitePool, bbox: &BoundingBox) -> Result<Vec<GraphNode>> {
    let rows = sqlx::query_as::<_, NodeRow>(
        r#"
        SELECT id, osm_id, latitude, longitude FROM graph_nodes
        WHERE latitude BETWEEN ?1 AND ?3 AND longitude BETWEEN ?2 AND ?4
        ORDER BY id
        "#,
    )
    .bind(bbox.min_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lat)
    .bind(bbox.max_lng)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(GraphNode::from).collect())
}

pub async fn count_nodes_in_bbox(pool: &SqlitePool, bbox: &BoundingBox) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM graph_nodes
        WHERE latitude BETWEEN ?1 AND ?3 AND longitude BETWEEN ?2 AND ?4
        "#,
    )
    .bind(bbox.min_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lat)
    .bind(bbox.max_lng)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Edges whose start and end nodes both lie inside `bbox`.
pub async fn find_edges_in_bbox(pool: &SqlitePool, bbox: &BoundingBox) -> Result<Vec<GraphEdge>> {
    let rows = sqlx::query_as::<_, EdgeRow>(
        r#"
        SELECT e.id, e.start_node_id, e.end_node_id, e.distance, e.base_cost, e.penalty
        FROM graph_edges e
        JOIN graph_nodes s ON s.id = e.start_node_id
        JOIN graph_nodes t ON t.id = e.end_node_id
        WHERE s.latitude BETWEEN ?1 AND ?3 AND s.longitude BETWEEN ?2 AND ?4
          AND t.latitude BETWEEN ?1 AND ?3 AND t.longitude BETWEEN ?2 AND ?4
        ORDER BY e.id
        "#,
    )
    .bind(bbox.min_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lat)
    .bind(bbox.max_lng)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(GraphEdge::from).collect())
}

/// Closest stored node inside `bbox` to the given position.
pub async fn nearest_node(
    pool: &SqlitePool,
    lat: f64,
    lng: f64,
    bbox: &BoundingBox,
) -> Result<Option<GraphNode>> {
    let nodes = find_nodes_in_bbox(pool, bbox).await?;
    Ok(closest(&nodes, lat, lng).cloned())
}

/// Nodes within `radius_m` of a position, nearest first.
pub async fn find_nodes_within_radius(
    pool: &SqlitePool,
    lat: f64,
    lng: f64,
    radius_m: f64,
) -> Result<Vec<GraphNode>> {
    let window = bbox_around(lat, lng, radius_m);
    let mut nodes: Vec<(f64, GraphNode)> = find_nodes_in_bbox(pool, &window)
        .await?
        .into_iter()
        .map(|node| (haversine_distance(lat, lng, node.lat, node.lng), node))
        .filter(|(distance, _)| *distance <= radius_m)
        .collect();
    nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(nodes.into_iter().map(|(_, node)| node).collect())
}

pub async fn graph_counts(pool: &SqlitePool) -> Result<GraphCounts> {
    let (nodes, edges): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM graph_nodes), (SELECT COUNT(*) FROM graph_edges)",
    )
    .fetch_one(pool)
    .await?;

    Ok(GraphCounts { nodes, edges })
}

// Internal row types for SQLx
#[derive(sqlx::FromRow)]
struct NodeRow {
    id: i64,
    osm_id: i64,
    latitude: f64,
    longitude: f64,
}

impl From<NodeRow> for GraphNode {
    fn from(row: NodeRow) -> Self {
        GraphNode {
            id: row.id,
            osm_id: row.osm_id,
            lat: row.latitude,
            lng: row.longitude,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EdgeRow {
    id: i64,
    start_node_id: i64,
    end_node_id: i64,
    distance: f64,
    base_cost: f64,
    penalty: f64,
}

impl From<EdgeRow> for GraphEdge {
    fn from(row: EdgeRow) -> Self {
        GraphEdge {
            id: row.id,
            start_node_id: row.start_node_id,
            end_node_id: row.end_node_id,
            distance: row.distance,
            base_cost: row.base_cost,
            penalty: row.penalty,
        }
    }
}
