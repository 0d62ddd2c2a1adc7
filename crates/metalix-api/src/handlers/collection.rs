//! 回收投放 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::dto::{DepositReceipt, DepositRequest};
use metalix_core::{CollectionFilter, RecyclingError, UserRole, WasteCollection};
use tracing::info;

use crate::{
    auth::{Claims, access::ensure_municipality},
    dto::{ApiResponse, CollectionQuery, PageResponse, PaginationParams, VerifyCollectionRequest},
    error::{ApiError, Result},
    state::AppState,
};

/// 投放列表，市民只能看到自己的投放
///
/// GET /api/collections
pub async fn list_collections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PaginationParams>,
    Query(query): Query<CollectionQuery>,
) -> Result<Json<ApiResponse<PageResponse<WasteCollection>>>> {
    let user_id = if claims.role == UserRole::Citizen {
        Some(claims.user_id()?)
    } else {
        query.user_id
    };
    let filter = CollectionFilter {
        user_id,
        collector_id: query.collector_id,
        municipality_id: claims.scoped_filter(query.municipality_id)?,
        recyclable_type: query.recyclable_type,
        from: query.from,
        to: query.to,
    };

    let (items, total) = state
        .repos
        .collections
        .list(&filter, page.limit(), page.offset())
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        page.page(),
        page.limit(),
    ))))
}

/// 记录一次投放
///
/// POST /api/collections
///
/// 市民只能为自己投放；回收点必须在当前用户的市政范围内
pub async fn create_collection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(mut req): Json<DepositRequest>,
) -> Result<Json<ApiResponse<DepositReceipt>>> {
    if claims.role == UserRole::Citizen {
        let own = claims.user_id()?;
        if req.user_id.is_some_and(|id| id != own) {
            return Err(ApiError::Forbidden("市民只能为自己记录投放".to_string()));
        }
        req.user_id = Some(own);
    }

    let receipt = state
        .collection_service
        .deposit(req, claims.scope()?)
        .await?;
    Ok(Json(ApiResponse::success(receipt)))
}

/// GET /api/collections/{id}
pub async fn get_collection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<WasteCollection>>> {
    let collection = state
        .repos
        .collections
        .get(id)
        .await?
        .ok_or(RecyclingError::CollectionNotFound(id))?;

    if claims.role == UserRole::Citizen {
        if collection.user_id != claims.user_id()? {
            return Err(ApiError::Forbidden("只能访问本人的数据".to_string()));
        }
    } else {
        ensure_municipality(&claims, collection.municipality_id)?;
    }
    Ok(Json(ApiResponse::success(collection)))
}

/// 管理员核验投放
///
/// PATCH /api/collections/{id}/verify
pub async fn verify_collection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<VerifyCollectionRequest>,
) -> Result<Json<ApiResponse<WasteCollection>>> {
    let collection = state
        .repos
        .collections
        .get(id)
        .await?
        .ok_or(RecyclingError::CollectionNotFound(id))?;
    ensure_municipality(&claims, collection.municipality_id)?;

    let verified = state.collection_service.verify(id, req.method).await?;
    info!(collection_id = id, operator = %claims.sub, "投放已核验");
    Ok(Json(ApiResponse::success(verified)))
}
