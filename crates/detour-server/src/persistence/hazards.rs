//! Read access to hazard reports owned by the issue-reporting service.

use sqlx::SqlitePool;

use detour_core::{BoundingBox, Hazard, HazardSource};

/// Unresolved reports with known coordinates inside `bbox`.
pub async fn list_active_hazards_near(
    pool: &SqlitePool,
    bbox: &BoundingBox,
) -> Result<Vec<Hazard>, sqlx::Error> {
    let rows = sqlx::query_as::<_, HazardRow>(
        r#"
        SELECT latitude, longitude, severity FROM hazard_reports
        WHERE status != 'RESOLVED'
          AND latitude IS NOT NULL AND longitude IS NOT NULL
          AND latitude BETWEEN ?1 AND ?3 AND longitude BETWEEN ?2 AND ?4
        "#,
    )
    .bind(bbox.min_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lat)
    .bind(bbox.max_lng)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Hazard::from).collect())
}

/// [`HazardSource`] backed by the `hazard_reports` table.
#[derive(Clone)]
pub struct SqliteHazardSource {
    pool: SqlitePool,
}

impl SqliteHazardSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl HazardSource for SqliteHazardSource {
    type Error = sqlx::Error;

    async fn list_active_hazards_near(&self, bbox: &BoundingBox) -> Result<Vec<Hazard>, Self::Error> {
        list_active_hazards_near(&self.pool, bbox).await
    }
}

#[derive(sqlx::FromRow)]
struct HazardRow {
    latitude: f64,
    longitude: f64,
    severity: Option<i64>,
}

impl From<HazardRow> for Hazard {
    fn from(row: HazardRow) -> Self {
        Hazard {
            lat: row.latitude,
            lng: row.longitude,
            severity: row.severity,
        }
    }
}
