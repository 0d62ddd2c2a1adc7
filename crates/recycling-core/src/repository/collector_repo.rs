//! 回收点与传感器仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use super::traits::CollectorRepositoryTrait;
use crate::error::Result;
use crate::models::{
    CollectorChanges, CollectorFilter, CollectorStatus, NewCollector, NewSensorReading,
    SensorReading, WasteCollector,
};

pub(crate) const COLLECTOR_COLUMNS: &str = r#"
    id, municipality_id, zone_id, name, location, status, capacity, current_weight,
    last_maintenance, next_maintenance, created_at, updated_at
"#;

/// 回收点仓储
pub struct CollectorRepository {
    pool: PgPool,
}

impl CollectorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<WasteCollector>> {
        let collector = sqlx::query_as::<_, WasteCollector>(&format!(
            "SELECT {COLLECTOR_COLUMNS} FROM waste_collectors WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collector)
    }

    pub async fn list(&self, filter: &CollectorFilter) -> Result<Vec<WasteCollector>> {
        let collectors = sqlx::query_as::<_, WasteCollector>(&format!(
            r#"
            SELECT {COLLECTOR_COLUMNS} FROM waste_collectors
            WHERE ($1::bigint IS NULL OR municipality_id = $1)
              AND ($2::bigint IS NULL OR zone_id = $2)
              AND ($3::varchar IS NULL OR status = $3)
            ORDER BY id ASC
            "#
        ))
        .bind(filter.municipality_id)
        .bind(filter.zone_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(collectors)
    }

    pub async fn create(&self, collector: &NewCollector) -> Result<WasteCollector> {
        let collector = sqlx::query_as::<_, WasteCollector>(&format!(
            r#"
            INSERT INTO waste_collectors (municipality_id, zone_id, name, location, capacity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLLECTOR_COLUMNS}
            "#
        ))
        .bind(collector.municipality_id)
        .bind(collector.zone_id)
        .bind(&collector.name)
        .bind(Json(&collector.location))
        .bind(collector.capacity)
        .fetch_one(&self.pool)
        .await?;

        Ok(collector)
    }

    pub async fn update(
        &self,
        id: i64,
        changes: &CollectorChanges,
    ) -> Result<Option<WasteCollector>> {
        let collector = sqlx::query_as::<_, WasteCollector>(&format!(
            r#"
            UPDATE waste_collectors SET
                name       = COALESCE($2, name),
                zone_id    = COALESCE($3, zone_id),
                location   = COALESCE($4, location),
                capacity   = COALESCE($5, capacity),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLLECTOR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(changes.zone_id)
        .bind(changes.location.as_ref().map(Json))
        .bind(changes.capacity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collector)
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: CollectorStatus,
    ) -> Result<Option<WasteCollector>> {
        let collector = sqlx::query_as::<_, WasteCollector>(&format!(
            r#"
            UPDATE waste_collectors SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLLECTOR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collector)
    }

    pub async fn record_maintenance(
        &self,
        id: i64,
        next_maintenance: DateTime<Utc>,
    ) -> Result<Option<WasteCollector>> {
        let collector = sqlx::query_as::<_, WasteCollector>(&format!(
            r#"
            UPDATE waste_collectors SET
                current_weight   = 0,
                status           = 'ACTIVE',
                last_maintenance = NOW(),
                next_maintenance = $2,
                updated_at       = NOW()
            WHERE id = $1
            RETURNING {COLLECTOR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(next_maintenance)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collector)
    }

    // ==================== 传感器 ====================

    pub async fn insert_sensor_reading(&self, reading: &NewSensorReading) -> Result<SensorReading> {
        let reading = sqlx::query_as::<_, SensorReading>(
            r#"
            INSERT INTO sensor_readings (collector_id, sensor_type, value, unit, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, collector_id, sensor_type, value, unit, status, recorded_at
            "#,
        )
        .bind(reading.collector_id)
        .bind(reading.sensor_type)
        .bind(reading.value)
        .bind(&reading.unit)
        .bind(reading.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(reading)
    }

    pub async fn list_sensor_readings(
        &self,
        collector_id: Option<i64>,
        municipality_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<SensorReading>> {
        let readings = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT r.id, r.collector_id, r.sensor_type, r.value, r.unit, r.status, r.recorded_at
            FROM sensor_readings r
            JOIN waste_collectors c ON c.id = r.collector_id
            WHERE ($1::bigint IS NULL OR r.collector_id = $1)
              AND ($2::bigint IS NULL OR c.municipality_id = $2)
            ORDER BY r.recorded_at DESC
            LIMIT $3
            "#,
        )
        .bind(collector_id)
        .bind(municipality_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(readings)
    }
}

#[async_trait]
impl CollectorRepositoryTrait for CollectorRepository {
    async fn get(&self, id: i64) -> Result<Option<WasteCollector>> {
        self.get(id).await
    }

    async fn list(&self, filter: &CollectorFilter) -> Result<Vec<WasteCollector>> {
        self.list(filter).await
    }

    async fn create(&self, collector: &NewCollector) -> Result<WasteCollector> {
        self.create(collector).await
    }

    async fn update(
        &self,
        id: i64,
        changes: &CollectorChanges,
    ) -> Result<Option<WasteCollector>> {
        self.update(id, changes).await
    }

    async fn update_status(
        &self,
        id: i64,
        status: CollectorStatus,
    ) -> Result<Option<WasteCollector>> {
        self.update_status(id, status).await
    }

    async fn record_maintenance(
        &self,
        id: i64,
        next_maintenance: DateTime<Utc>,
    ) -> Result<Option<WasteCollector>> {
        self.record_maintenance(id, next_maintenance).await
    }

    async fn insert_sensor_reading(&self, reading: &NewSensorReading) -> Result<SensorReading> {
        self.insert_sensor_reading(reading).await
    }

    async fn list_sensor_readings(
        &self,
        collector_id: Option<i64>,
        municipality_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<SensorReading>> {
        self.list_sensor_readings(collector_id, municipality_id, limit)
            .await
    }
}
