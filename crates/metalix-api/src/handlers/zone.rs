//! 区域 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::{NewZone, RecyclingError, Zone, ZoneChanges};
use tracing::info;
use validator::Validate;

use crate::{
    auth::{Claims, access::ensure_municipality},
    dto::{ApiResponse, CreateZoneRequest, DeletedResponse, MunicipalityFilterQuery},
    error::{ApiError, Result},
    handlers::target_municipality,
    state::AppState,
};

async fn scoped_zone(state: &AppState, claims: &Claims, id: i64) -> Result<Zone> {
    let zone = state
        .repos
        .municipalities
        .get_zone(id)
        .await?
        .ok_or(RecyclingError::ZoneNotFound(id))?;
    ensure_municipality(claims, zone.municipality_id)?;
    Ok(zone)
}

/// GET /api/zones
pub async fn list_zones(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MunicipalityFilterQuery>,
) -> Result<Json<ApiResponse<Vec<Zone>>>> {
    let municipality_id = claims.scoped_filter(query.municipality_id)?;
    let zones = state.repos.municipalities.list_zones(municipality_id).await?;
    Ok(Json(ApiResponse::success(zones)))
}

/// GET /api/zones/{id}
pub async fn get_zone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Zone>>> {
    let zone = scoped_zone(&state, &claims, id).await?;
    Ok(Json(ApiResponse::success(zone)))
}

/// 创建区域
///
/// POST /api/zones
pub async fn create_zone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateZoneRequest>,
) -> Result<Json<ApiResponse<Zone>>> {
    req.validate()?;
    if !req.boundaries.is_valid() {
        return Err(ApiError::Validation("区域边界坐标无效".to_string()));
    }

    let municipality_id = target_municipality(&claims, req.municipality_id)?;
    state
        .repos
        .municipalities
        .get(municipality_id)
        .await?
        .ok_or(RecyclingError::MunicipalityNotFound(municipality_id))?;

    let zone = state
        .repos
        .municipalities
        .create_zone(&NewZone {
            municipality_id,
            name: req.name,
            boundaries: req.boundaries,
            population: req.population,
            zone_type: req.zone_type,
        })
        .await?;

    info!(zone_id = zone.id, municipality_id, "区域已创建");
    Ok(Json(ApiResponse::success(zone)))
}

/// PATCH /api/zones/{id}
pub async fn update_zone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(changes): Json<ZoneChanges>,
) -> Result<Json<ApiResponse<Zone>>> {
    scoped_zone(&state, &claims, id).await?;
    if changes.boundaries.is_some_and(|b| !b.is_valid()) {
        return Err(ApiError::Validation("区域边界坐标无效".to_string()));
    }
    if changes.population.is_some_and(|p| p < 0) {
        return Err(ApiError::Validation("人口不能为负数".to_string()));
    }

    let zone = state
        .repos
        .municipalities
        .update_zone(id, &changes)
        .await?
        .ok_or(RecyclingError::ZoneNotFound(id))?;
    info!(zone_id = id, "区域已更新");
    Ok(Json(ApiResponse::success(zone)))
}

/// 删除区域，区域下的回收点解除关联
///
/// DELETE /api/zones/{id}
pub async fn delete_zone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    scoped_zone(&state, &claims, id).await?;
    if !state.repos.municipalities.delete_zone(id).await? {
        return Err(RecyclingError::ZoneNotFound(id).into());
    }
    info!(zone_id = id, operator = %claims.sub, "区域已删除");
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}
