//! 监控 API 处理器：报表、运行指标和告警

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::{Alert, AlertFilter, Metric, MetricFilter, NewAlert, NewMetric, Report};
use tracing::info;
use validator::Validate;

use crate::{
    auth::Claims,
    dto::{
        AlertQuery, ApiResponse, CreateAlertRequest, CreateMetricRequest, CreateReportRequest,
        MetricQuery, MunicipalityFilterQuery, PageResponse, PaginationParams,
    },
    error::{ApiError, Result},
    handlers::target_municipality,
    state::AppState,
};

// ==================== 报表 ====================

/// GET /api/reports
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PaginationParams>,
    Query(query): Query<MunicipalityFilterQuery>,
) -> Result<Json<ApiResponse<PageResponse<Report>>>> {
    let municipality_id = claims.scoped_filter(query.municipality_id)?;
    let (items, total) = state
        .monitoring_service
        .list_reports(municipality_id, page.limit(), page.offset())
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        page.page(),
        page.limit(),
    ))))
}

/// 同步生成报表
///
/// POST /api/reports
pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReportRequest>,
) -> Result<Json<ApiResponse<Report>>> {
    let municipality_id = target_municipality(&claims, req.municipality_id)?;
    let report = state
        .monitoring_service
        .generate_report(req.report_type, municipality_id, claims.user_id()?)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Report>>> {
    let report = state
        .monitoring_service
        .get_report(id, claims.scope()?)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

// ==================== 指标 ====================

/// GET /api/metrics
pub async fn list_metrics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MetricQuery>,
) -> Result<Json<ApiResponse<Vec<Metric>>>> {
    let filter = MetricFilter {
        municipality_id: claims.scoped_filter(query.municipality_id)?,
        name: query.name.filter(|n| !n.is_empty()),
    };
    let metrics = state
        .monitoring_service
        .list_metrics(&filter, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(metrics)))
}

/// POST /api/metrics
pub async fn record_metric(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMetricRequest>,
) -> Result<Json<ApiResponse<Metric>>> {
    req.validate()?;
    let municipality_id = target_municipality(&claims, req.municipality_id)?;

    let metric = state
        .monitoring_service
        .record_metric(&NewMetric {
            name: req.name,
            value: req.value,
            unit: req.unit,
            source: req.source,
            municipality_id,
            metadata: req.metadata,
        })
        .await?;
    Ok(Json(ApiResponse::success(metric)))
}

// ==================== 告警 ====================

/// GET /api/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PaginationParams>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<ApiResponse<PageResponse<Alert>>>> {
    let filter = AlertFilter {
        municipality_id: claims.scoped_filter(query.municipality_id)?,
        is_resolved: query.is_resolved,
    };
    let (items, total) = state
        .monitoring_service
        .list_alerts(&filter, page.limit(), page.offset())
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        page.page(),
        page.limit(),
    ))))
}

/// 手动创建告警
///
/// POST /api/alerts
///
/// 关联回收点时市政取回收点所在市政；系统管理员可创建不属于任何市政的系统告警
pub async fn create_alert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateAlertRequest>,
) -> Result<Json<ApiResponse<Alert>>> {
    req.validate()?;

    let municipality_id = match req.collector_id {
        Some(collector_id) => {
            let collector = state
                .collector_service
                .get_scoped(collector_id, claims.scope()?)
                .await?;
            if let Some(requested) = req.municipality_id
                && requested != collector.municipality_id
            {
                return Err(ApiError::Validation(format!(
                    "回收点 {} 不属于市政 {}",
                    collector_id, requested
                )));
            }
            Some(collector.municipality_id)
        }
        None => claims.scoped_filter(req.municipality_id)?,
    };

    let alert = state
        .monitoring_service
        .create_alert(&NewAlert {
            alert_type: req.alert_type,
            severity: req.severity,
            message: req.message,
            source: req.source,
            municipality_id,
            collector_id: req.collector_id,
            metadata: req.metadata,
        })
        .await?;

    info!(alert_id = alert.id, operator = %claims.sub, "告警已创建");
    Ok(Json(ApiResponse::success(alert)))
}

/// 解决告警，重复解决直接返回
///
/// PATCH /api/alerts/{id}/resolve
pub async fn resolve_alert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Alert>>> {
    let alert = state
        .monitoring_service
        .resolve_alert(id, claims.scope()?)
        .await?;
    Ok(Json(ApiResponse::success(alert)))
}
