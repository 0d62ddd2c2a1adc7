//! 用户管理 API 处理器
//!
//! 用户列表、创建、修改、停用，以及档案、统计、积分、流水、投放和活动流

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use metalix_core::dto::{ActivityItem, UserProfile, UserStats};
use metalix_core::{
    CollectionFilter, NewUser, RecyclingError, RewardTransaction, TransactionFilter, User,
    UserChanges, UserFilter, UserPoints, UserRole, WasteCollection,
};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    auth::{
        Claims, ensure_not_self_deactivation, ensure_user_access, ensure_user_management,
        hash_password,
    },
    dto::{
        ActivityQuery, ApiResponse, CreateUserRequest, PageResponse, PaginationParams,
        UpdateUserRequest, UserQuery,
    },
    error::{ApiError, Result},
    handlers::load_user,
    state::AppState,
};

/// 加载用户并校验访问权限
async fn accessible_user(state: &AppState, claims: &Claims, id: i64) -> Result<User> {
    let user = load_user(state, id).await?;
    ensure_user_access(claims, &user)?;
    Ok(user)
}

/// 用户列表
///
/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PaginationParams>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<PageResponse<User>>>> {
    let filter = UserFilter {
        municipality_id: claims.scoped_filter(query.municipality_id)?,
        role: query.role,
        q: query.q.filter(|q| !q.trim().is_empty()),
        is_active: query.is_active,
    };

    let (items, total) = state
        .repos
        .users
        .list(&filter, page.limit(), page.offset())
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        page.page(),
        page.limit(),
    ))))
}

/// 管理员创建用户
///
/// POST /api/users
///
/// 市政管理员只能在本市政下创建市民；市民账户会自动发放 RFID 卡
pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<User>>> {
    req.validate()?;

    if !claims.is_system_admin() && req.role != UserRole::Citizen {
        return Err(ApiError::Forbidden("市政管理员只能创建市民账户".to_string()));
    }

    let municipality_id = if req.role.requires_municipality() {
        let id = crate::handlers::target_municipality(&claims, req.municipality_id)?;
        state
            .repos
            .municipalities
            .get(id)
            .await?
            .ok_or(RecyclingError::MunicipalityNotFound(id))?;
        Some(id)
    } else {
        if req.municipality_id.is_some() {
            return Err(ApiError::Validation(
                "系统管理员不能关联市政".to_string(),
            ));
        }
        None
    };

    let password_hash = hash_password(&req.password)?;
    let user = state
        .repos
        .users
        .create(&NewUser {
            email: req.email.trim().to_lowercase(),
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            municipality_id,
            phone: req.phone,
            address: req.address,
            city: req.city,
            zip_code: req.zip_code,
        })
        .await?;

    if user.is_citizen()
        && let Err(e) = state.identification_service.issue_card(user.id).await
    {
        warn!(user_id = user.id, error = %e, "创建用户后自动发卡失败");
    }

    info!(
        user_id = user.id,
        role = user.role.as_str(),
        operator = %claims.sub,
        "用户已创建"
    );
    Ok(Json(ApiResponse::success(user)))
}

/// 用户详情
///
/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<User>>> {
    let user = accessible_user(&state, &claims, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// 修改用户，isActive 只有管理员可改
///
/// PATCH /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>> {
    req.validate()?;
    let user = accessible_user(&state, &claims, id).await?;
    if req.is_active.is_some() {
        ensure_user_management(&claims, &user)?;
    }
    if req.is_active == Some(false) {
        ensure_not_self_deactivation(&claims, id)?;
    }

    let changes = UserChanges::from(req);
    let updated = state
        .repos
        .users
        .update(id, &changes)
        .await?
        .ok_or(RecyclingError::UserNotFound(id))?;

    info!(user_id = id, operator = %claims.sub, "用户已更新");
    Ok(Json(ApiResponse::success(updated)))
}

/// 停用用户（软删除）
///
/// DELETE /api/users/{id}
pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<User>>> {
    let user = load_user(&state, id).await?;
    ensure_user_management(&claims, &user)?;
    ensure_not_self_deactivation(&claims, id)?;

    let changes = UserChanges {
        is_active: Some(false),
        ..Default::default()
    };
    let updated = state
        .repos
        .users
        .update(id, &changes)
        .await?
        .ok_or(RecyclingError::UserNotFound(id))?;

    info!(user_id = id, operator = %claims.sub, "用户已停用");
    Ok(Json(ApiResponse::success(updated)))
}

/// 用户档案
///
/// GET /api/users/{id}/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    accessible_user(&state, &claims, id).await?;
    let profile = state.identification_service.profile(id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// 用户统计
///
/// GET /api/users/{id}/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserStats>>> {
    accessible_user(&state, &claims, id).await?;
    let stats = state.dashboard_service.user_stats(id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// 积分余额
///
/// GET /api/users/{id}/points
pub async fn get_points(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserPoints>>> {
    accessible_user(&state, &claims, id).await?;
    let points = state.ledger_service.user_points(id).await?;
    Ok(Json(ApiResponse::success(points)))
}

/// 用户积分流水
///
/// GET /api/users/{id}/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<RewardTransaction>>>> {
    accessible_user(&state, &claims, id).await?;
    let filter = TransactionFilter {
        user_id: Some(id),
        ..Default::default()
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

/// 用户投放记录
///
/// GET /api/users/{id}/collections
pub async fn list_collections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<WasteCollection>>>> {
    accessible_user(&state, &claims, id).await?;
    let filter = CollectionFilter {
        user_id: Some(id),
        ..Default::default()
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

/// 最近活动
///
/// GET /api/users/{id}/activity?limit=10
pub async fn get_activity(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityItem>>>> {
    accessible_user(&state, &claims, id).await?;
    let items = state.identification_service.activity(id, query.limit).await?;
    Ok(Json(ApiResponse::success(items)))
}
