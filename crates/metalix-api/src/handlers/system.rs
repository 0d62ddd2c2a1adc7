//! 系统级 API 处理器

use axum::{Json, extract::State};
use metalix_core::dto::SystemOverview;

use crate::{dto::ApiResponse, error::Result, state::AppState};

/// 全系统概览
///
/// GET /api/system/overview
pub async fn overview(State(state): State<AppState>) -> Result<Json<ApiResponse<SystemOverview>>> {
    let overview = state.dashboard_service.system_overview().await?;
    Ok(Json(ApiResponse::success(overview)))
}
