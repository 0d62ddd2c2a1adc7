//! RFID 卡 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::{RecyclingError, RfidCard, RfidCardFilter};
use tracing::info;

use crate::{
    auth::{Claims, ensure_user_management},
    dto::{ApiResponse, IssueCardRequest, PageResponse, PaginationParams, RfidCardQuery},
    error::Result,
    handlers::load_user,
    state::AppState,
};

/// 校验管理员对持卡人的管理权限，未分配的卡只有系统管理员可操作
async fn ensure_card_access(state: &AppState, claims: &Claims, card: &RfidCard) -> Result<()> {
    match card.user_id {
        Some(owner) => {
            let owner = load_user(state, owner).await?;
            ensure_user_management(claims, &owner)
        }
        None if claims.is_system_admin() => Ok(()),
        None => Err(RecyclingError::RfidCardNotFound(card.card_number.clone()).into()),
    }
}

/// GET /api/rfid-cards
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PaginationParams>,
    Query(query): Query<RfidCardQuery>,
) -> Result<Json<ApiResponse<PageResponse<RfidCard>>>> {
    let filter = RfidCardFilter {
        user_id: query.user_id,
        municipality_id: claims.scoped_filter(query.municipality_id)?,
        is_active: query.is_active,
    };

    let (items, total) = state
        .repos
        .rfid_cards
        .list(&filter, page.limit(), page.offset())
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        page.page(),
        page.limit(),
    ))))
}

/// 为用户发放新卡，原有效卡自动停用
///
/// POST /api/rfid-cards
pub async fn issue_card(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<IssueCardRequest>,
) -> Result<Json<ApiResponse<RfidCard>>> {
    let user = load_user(&state, req.user_id).await?;
    ensure_user_management(&claims, &user)?;

    let card = state.identification_service.issue_card(user.id).await?;
    info!(user_id = user.id, card_id = card.id, operator = %claims.sub, "管理员发卡");
    Ok(Json(ApiResponse::success(card)))
}

/// 按卡号查询
///
/// GET /api/rfid-cards/lookup/{cardNumber}
pub async fn lookup_card(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(card_number): Path<String>,
) -> Result<Json<ApiResponse<RfidCard>>> {
    let card = state.identification_service.lookup(&card_number).await?;
    ensure_card_access(&state, &claims, &card).await?;
    Ok(Json(ApiResponse::success(card)))
}

/// PATCH /api/rfid-cards/{id}/deactivate
pub async fn deactivate_card(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RfidCard>>> {
    let card = state
        .repos
        .rfid_cards
        .get(id)
        .await?
        .ok_or_else(|| RecyclingError::RfidCardNotFound(id.to_string()))?;
    ensure_card_access(&state, &claims, &card).await?;

    let card = state.identification_service.deactivate_card(id).await?;
    Ok(Json(ApiResponse::success(card)))
}
