//! 积分流水 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::{RecyclingError, RewardTransaction, TransactionFilter, UserRole};
use tracing::info;

use crate::{
    auth::{Claims, ensure_user_management},
    dto::{ApiResponse, CancellationResponse, PageResponse, PaginationParams, TransactionQuery},
    error::Result,
    handlers::load_user,
    state::AppState,
};

/// 流水列表，市民只能看到自己的流水
///
/// GET /api/reward-transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PaginationParams>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<ApiResponse<PageResponse<RewardTransaction>>>> {
    let filter = if claims.role == UserRole::Citizen {
        TransactionFilter {
            user_id: Some(claims.user_id()?),
            municipality_id: None,
            transaction_type: query.transaction_type,
            status: query.status,
        }
    } else {
        TransactionFilter {
            user_id: query.user_id,
            municipality_id: claims.scoped_filter(query.municipality_id)?,
            transaction_type: query.transaction_type,
            status: query.status,
        }
    };

    let (items, total) = state
        .repos
        .transactions
        .list(&filter, page.limit(), page.offset())
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        page.page(),
        page.limit(),
    ))))
}

/// 取消兑换，退还积分并恢复库存
///
/// POST /api/reward-transactions/{id}/cancel
pub async fn cancel_transaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CancellationResponse>>> {
    let transaction = state
        .repos
        .transactions
        .get(id)
        .await?
        .ok_or(RecyclingError::TransactionNotFound(id))?;
    let owner = load_user(&state, transaction.user_id).await?;
    ensure_user_management(&claims, &owner)?;

    let outcome = state.redemption_service.cancel(id).await?;
    info!(transaction_id = id, operator = %claims.sub, "管理员取消兑换");
    Ok(Json(ApiResponse::success(CancellationResponse::from(outcome))))
}
