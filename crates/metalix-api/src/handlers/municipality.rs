//! 市政 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::dto::{DashboardData, DashboardFilter, MunicipalityStats};
use metalix_core::{Municipality, MunicipalityChanges, NewMunicipality, RecyclingError};
use metalix_shared::cache::CacheKey;
use tracing::info;
use validator::Validate;

use crate::{
    auth::{Claims, access::ensure_municipality},
    dto::{ApiResponse, CreateMunicipalityRequest},
    error::{ApiError, Result},
    state::AppState,
};

/// 启用中的市政列表（公开，注册页使用）
///
/// GET /api/municipalities
pub async fn list_municipalities(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Municipality>>>> {
    let items = state.repos.municipalities.list(true).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// GET /api/municipalities/{id}
pub async fn get_municipality(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Municipality>>> {
    let municipality = state
        .repos
        .municipalities
        .get(id)
        .await?
        .ok_or(RecyclingError::MunicipalityNotFound(id))?;
    Ok(Json(ApiResponse::success(municipality)))
}

/// 创建市政
///
/// POST /api/municipalities
pub async fn create_municipality(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMunicipalityRequest>,
) -> Result<Json<ApiResponse<Municipality>>> {
    req.validate()?;

    let municipality = state
        .repos
        .municipalities
        .create(&NewMunicipality {
            name: req.name,
            code: req.code.trim().to_uppercase(),
            region: req.region,
            population: req.population,
            area: req.area,
            contact_info: req.contact_info,
        })
        .await?;

    state.cache.invalidate(&[CacheKey::system_overview()]).await;
    info!(
        municipality_id = municipality.id,
        code = %municipality.code,
        operator = %claims.sub,
        "市政已创建"
    );
    Ok(Json(ApiResponse::success(municipality)))
}

/// 修改市政，市政管理员只能改本市政且不能修改启用状态
///
/// PATCH /api/municipalities/{id}
pub async fn update_municipality(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(changes): Json<MunicipalityChanges>,
) -> Result<Json<ApiResponse<Municipality>>> {
    ensure_municipality(&claims, id)?;
    if changes.is_active.is_some() && !claims.is_system_admin() {
        return Err(ApiError::Forbidden(
            "只有系统管理员可以修改市政启用状态".to_string(),
        ));
    }
    if changes.population.is_some_and(|p| p < 0) || changes.area.is_some_and(|a| a < 0.0) {
        return Err(ApiError::Validation("人口和面积不能为负数".to_string()));
    }

    let municipality = state
        .repos
        .municipalities
        .update(id, &changes)
        .await?
        .ok_or(RecyclingError::MunicipalityNotFound(id))?;

    state
        .cache
        .invalidate(&CacheKey::municipality_keys(id))
        .await;
    info!(municipality_id = id, operator = %claims.sub, "市政已更新");
    Ok(Json(ApiResponse::success(municipality)))
}

/// 停用市政（软删除）
///
/// DELETE /api/municipalities/{id}
pub async fn deactivate_municipality(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Municipality>>> {
    let changes = MunicipalityChanges {
        is_active: Some(false),
        ..Default::default()
    };
    let municipality = state
        .repos
        .municipalities
        .update(id, &changes)
        .await?
        .ok_or(RecyclingError::MunicipalityNotFound(id))?;

    state
        .cache
        .invalidate(&CacheKey::municipality_keys(id))
        .await;
    info!(municipality_id = id, operator = %claims.sub, "市政已停用");
    Ok(Json(ApiResponse::success(municipality)))
}

/// GET /api/municipalities/{id}/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MunicipalityStats>>> {
    ensure_municipality(&claims, id)?;
    let stats = state.dashboard_service.municipality_stats(id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// 市政看板，无过滤条件时走缓存
///
/// GET /api/municipalities/{id}/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(filter): Query<DashboardFilter>,
) -> Result<Json<ApiResponse<DashboardData>>> {
    ensure_municipality(&claims, id)?;
    let dashboard = state.dashboard_service.dashboard(id, filter).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}
