//! 市政与区域仓储

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use super::traits::MunicipalityRepositoryTrait;
use crate::error::{RecyclingError, Result};
use crate::models::{Municipality, MunicipalityChanges, NewMunicipality, NewZone, Zone, ZoneChanges};

const MUNICIPALITY_COLUMNS: &str = r#"
    id, name, code, region, population, area, contact_info, is_active, created_at, updated_at
"#;

const ZONE_COLUMNS: &str = r#"
    id, municipality_id, name, boundaries, population, zone_type, created_at, updated_at
"#;

/// 市政仓储
pub struct MunicipalityRepository {
    pool: PgPool,
}

impl MunicipalityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 市政 ====================

    pub async fn get(&self, id: i64) -> Result<Option<Municipality>> {
        let municipality = sqlx::query_as::<_, Municipality>(&format!(
            "SELECT {MUNICIPALITY_COLUMNS} FROM municipalities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(municipality)
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Municipality>> {
        let municipalities = sqlx::query_as::<_, Municipality>(&format!(
            r#"
            SELECT {MUNICIPALITY_COLUMNS} FROM municipalities
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY name ASC
            "#
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(municipalities)
    }

    #[instrument(skip(self, municipality), fields(code = %municipality.code))]
    pub async fn create(&self, municipality: &NewMunicipality) -> Result<Municipality> {
        let code = municipality.code.to_uppercase();
        sqlx::query_as::<_, Municipality>(&format!(
            r#"
            INSERT INTO municipalities (name, code, region, population, area, contact_info)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MUNICIPALITY_COLUMNS}
            "#
        ))
        .bind(&municipality.name)
        .bind(&code)
        .bind(&municipality.region)
        .bind(municipality.population)
        .bind(municipality.area)
        .bind(Json(&municipality.contact_info))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RecyclingError::from_unique_violation(e, format!("市政编码已存在: {code}")))
    }

    pub async fn update(
        &self,
        id: i64,
        changes: &MunicipalityChanges,
    ) -> Result<Option<Municipality>> {
        let municipality = sqlx::query_as::<_, Municipality>(&format!(
            r#"
            UPDATE municipalities SET
                name         = COALESCE($2, name),
                region       = COALESCE($3, region),
                population   = COALESCE($4, population),
                area         = COALESCE($5, area),
                contact_info = COALESCE($6, contact_info),
                is_active    = COALESCE($7, is_active),
                updated_at   = NOW()
            WHERE id = $1
            RETURNING {MUNICIPALITY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.region)
        .bind(changes.population)
        .bind(changes.area)
        .bind(changes.contact_info.as_ref().map(Json))
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(municipality)
    }

    // ==================== 区域 ====================

    pub async fn get_zone(&self, id: i64) -> Result<Option<Zone>> {
        let zone = sqlx::query_as::<_, Zone>(&format!("SELECT {ZONE_COLUMNS} FROM zones WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(zone)
    }

    pub async fn list_zones(&self, municipality_id: Option<i64>) -> Result<Vec<Zone>> {
        let zones = sqlx::query_as::<_, Zone>(&format!(
            r#"
            SELECT {ZONE_COLUMNS} FROM zones
            WHERE ($1::bigint IS NULL OR municipality_id = $1)
            ORDER BY id ASC
            "#
        ))
        .bind(municipality_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(zones)
    }

    pub async fn create_zone(&self, zone: &NewZone) -> Result<Zone> {
        let zone = sqlx::query_as::<_, Zone>(&format!(
            r#"
            INSERT INTO zones (municipality_id, name, boundaries, population, zone_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ZONE_COLUMNS}
            "#
        ))
        .bind(zone.municipality_id)
        .bind(&zone.name)
        .bind(Json(zone.boundaries))
        .bind(zone.population)
        .bind(zone.zone_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(zone)
    }

    pub async fn update_zone(&self, id: i64, changes: &ZoneChanges) -> Result<Option<Zone>> {
        let zone = sqlx::query_as::<_, Zone>(&format!(
            r#"
            UPDATE zones SET
                name       = COALESCE($2, name),
                boundaries = COALESCE($3, boundaries),
                population = COALESCE($4, population),
                zone_type  = COALESCE($5, zone_type),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ZONE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(changes.boundaries.map(Json))
        .bind(changes.population)
        .bind(changes.zone_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(zone)
    }

    /// 回收点的 zone_id 由外键置空
    pub async fn delete_zone(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM zones WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MunicipalityRepositoryTrait for MunicipalityRepository {
    async fn get(&self, id: i64) -> Result<Option<Municipality>> {
        self.get(id).await
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Municipality>> {
        self.list(active_only).await
    }

    async fn create(&self, municipality: &NewMunicipality) -> Result<Municipality> {
        self.create(municipality).await
    }

    async fn update(
        &self,
        id: i64,
        changes: &MunicipalityChanges,
    ) -> Result<Option<Municipality>> {
        self.update(id, changes).await
    }

    async fn get_zone(&self, id: i64) -> Result<Option<Zone>> {
        self.get_zone(id).await
    }

    async fn list_zones(&self, municipality_id: Option<i64>) -> Result<Vec<Zone>> {
        self.list_zones(municipality_id).await
    }

    async fn create_zone(&self, zone: &NewZone) -> Result<Zone> {
        self.create_zone(zone).await
    }

    async fn update_zone(&self, id: i64, changes: &ZoneChanges) -> Result<Option<Zone>> {
        self.update_zone(id, changes).await
    }

    async fn delete_zone(&self, id: i64) -> Result<bool> {
        self.delete_zone(id).await
    }
}
