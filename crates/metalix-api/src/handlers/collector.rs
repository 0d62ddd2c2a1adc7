//! 回收点与传感器 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::{
    CollectorChanges, CollectorFilter, CollectorStatus, NewCollector, RecyclingError,
    SensorReading, WasteCollector,
};
use tracing::info;
use validator::Validate;

use crate::{
    auth::Claims,
    dto::{
        ApiResponse, CollectorQuery, CreateCollectorRequest, SensorQuery, SensorReadingRequest,
        UpdateCollectorStatusRequest,
    },
    error::{ApiError, Result},
    handlers::target_municipality,
    state::AppState,
};

const DEFAULT_SENSOR_LIMIT: i64 = 50;
const MAX_SENSOR_LIMIT: i64 = 500;

/// 区域必须存在且属于回收点所在市政
async fn ensure_zone_in(state: &AppState, zone_id: i64, municipality_id: i64) -> Result<()> {
    let zone = state
        .repos
        .municipalities
        .get_zone(zone_id)
        .await?
        .ok_or(RecyclingError::ZoneNotFound(zone_id))?;
    if zone.municipality_id != municipality_id {
        return Err(ApiError::Validation(format!(
            "区域 {} 不属于市政 {}",
            zone_id, municipality_id
        )));
    }
    Ok(())
}

/// GET /api/collectors
pub async fn list_collectors(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<CollectorQuery>,
) -> Result<Json<ApiResponse<Vec<WasteCollector>>>> {
    let filter = CollectorFilter {
        municipality_id: claims.scoped_filter(query.municipality_id)?,
        zone_id: query.zone_id,
        status: query.status,
    };
    let collectors = state.repos.collectors.list(&filter).await?;
    Ok(Json(ApiResponse::success(collectors)))
}

/// GET /api/collectors/{id}
pub async fn get_collector(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<WasteCollector>>> {
    let collector = state
        .collector_service
        .get_scoped(id, claims.scope()?)
        .await?;
    Ok(Json(ApiResponse::success(collector)))
}

/// 创建回收点
///
/// POST /api/collectors
pub async fn create_collector(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCollectorRequest>,
) -> Result<Json<ApiResponse<WasteCollector>>> {
    req.validate()?;

    let municipality_id = target_municipality(&claims, req.municipality_id)?;
    state
        .repos
        .municipalities
        .get(municipality_id)
        .await?
        .ok_or(RecyclingError::MunicipalityNotFound(municipality_id))?;
    if let Some(zone_id) = req.zone_id {
        ensure_zone_in(&state, zone_id, municipality_id).await?;
    }

    let collector = state
        .repos
        .collectors
        .create(&NewCollector {
            municipality_id,
            zone_id: req.zone_id,
            name: req.name,
            location: req.location,
            capacity: req.capacity,
        })
        .await?;

    info!(
        collector_id = collector.id,
        municipality_id,
        capacity = collector.capacity,
        "回收点已创建"
    );
    Ok(Json(ApiResponse::success(collector)))
}

/// PATCH /api/collectors/{id}
pub async fn update_collector(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(changes): Json<CollectorChanges>,
) -> Result<Json<ApiResponse<WasteCollector>>> {
    let current = state
        .collector_service
        .get_scoped(id, claims.scope()?)
        .await?;
    if changes.capacity.is_some_and(|c| !c.is_finite() || c <= 0.0) {
        return Err(ApiError::Validation("容量必须大于0".to_string()));
    }
    if let Some(zone_id) = changes.zone_id {
        ensure_zone_in(&state, zone_id, current.municipality_id).await?;
    }

    let collector = state
        .repos
        .collectors
        .update(id, &changes)
        .await?
        .ok_or(RecyclingError::CollectorNotFound(id))?;
    info!(collector_id = id, "回收点已更新");
    Ok(Json(ApiResponse::success(collector)))
}

/// 停用回收点（软删除，状态置为 INACTIVE）
///
/// DELETE /api/collectors/{id}
pub async fn deactivate_collector(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<WasteCollector>>> {
    let collector = state
        .collector_service
        .update_status(id, CollectorStatus::Inactive, claims.scope()?)
        .await?;
    Ok(Json(ApiResponse::success(collector)))
}

/// PUT /api/collectors/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCollectorStatusRequest>,
) -> Result<Json<ApiResponse<WasteCollector>>> {
    let collector = state
        .collector_service
        .update_status(id, req.status, claims.scope()?)
        .await?;
    Ok(Json(ApiResponse::success(collector)))
}

/// 记录清运维护
///
/// POST /api/collectors/{id}/maintenance
pub async fn record_maintenance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<WasteCollector>>> {
    let collector = state
        .collector_service
        .record_maintenance(id, claims.scope()?)
        .await?;
    Ok(Json(ApiResponse::success(collector)))
}

/// 传感器读数列表，新的在前
///
/// GET /api/sensor-data
pub async fn list_sensor_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SensorQuery>,
) -> Result<Json<ApiResponse<Vec<SensorReading>>>> {
    let scope = claims.scope()?;
    if let Some(collector_id) = query.collector_id {
        state
            .collector_service
            .get_scoped(collector_id, scope)
            .await?;
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_SENSOR_LIMIT)
        .clamp(1, MAX_SENSOR_LIMIT);
    let readings = state
        .repos
        .collectors
        .list_sensor_readings(query.collector_id, scope, limit)
        .await?;
    Ok(Json(ApiResponse::success(readings)))
}

/// 上报传感器读数
///
/// POST /api/sensor-data
pub async fn ingest_sensor_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SensorReadingRequest>,
) -> Result<Json<ApiResponse<SensorReading>>> {
    req.validate()?;
    if !req.value.is_finite() {
        return Err(ApiError::Validation("读数必须是有限数".to_string()));
    }

    let reading = state
        .collector_service
        .ingest_reading(
            req.collector_id,
            req.sensor_type,
            req.value,
            req.unit,
            claims.scope()?,
        )
        .await?;
    Ok(Json(ApiResponse::success(reading)))
}
