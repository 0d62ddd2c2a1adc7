//! 奖励 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use metalix_core::dto::RedemptionReceipt;
use metalix_core::{NewReward, RecyclingError, Reward, RewardChanges, RewardFilter, UserRole};
use tracing::info;
use validator::Validate;

use crate::{
    auth::{Claims, access::ensure_municipality},
    dto::{ApiResponse, CreateRewardRequest, PageResponse, PaginationParams, RewardQuery},
    error::{ApiError, Result},
    handlers::target_municipality,
    state::AppState,
};

async fn scoped_reward(state: &AppState, claims: &Claims, id: i64) -> Result<Reward> {
    let reward = state
        .repos
        .rewards
        .get(id)
        .await?
        .ok_or(RecyclingError::RewardNotFound(id))?;
    ensure_municipality(claims, reward.municipality_id)?;
    Ok(reward)
}

fn validate_changes(changes: &RewardChanges) -> Result<()> {
    if changes.points_cost.is_some_and(|p| p < 1) {
        return Err(ApiError::Validation("所需积分必须大于0".to_string()));
    }
    if changes.stock.is_some_and(|s| s < 0) {
        return Err(ApiError::Validation("库存不能为负数".to_string()));
    }
    if changes.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::Validation("奖励名称不能为空".to_string()));
    }
    if changes.clear_valid_until && changes.valid_until.is_some() {
        return Err(ApiError::Validation(
            "不能同时设置和清除有效期".to_string(),
        ));
    }
    Ok(())
}

/// 奖励列表，市民只能看到可兑换的奖励
///
/// GET /api/rewards
pub async fn list_rewards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PaginationParams>,
    Query(query): Query<RewardQuery>,
) -> Result<Json<ApiResponse<PageResponse<Reward>>>> {
    let filter = RewardFilter {
        municipality_id: claims.scoped_filter(query.municipality_id)?,
        category: query.category,
        available_only: query.available_only || claims.role == UserRole::Citizen,
    };

    let (items, total) = state
        .repos
        .rewards
        .list(&filter, page.limit(), page.offset())
        .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        items,
        total,
        page.page(),
        page.limit(),
    ))))
}

/// GET /api/rewards/{id}
pub async fn get_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Reward>>> {
    let reward = scoped_reward(&state, &claims, id).await?;
    Ok(Json(ApiResponse::success(reward)))
}

/// 创建奖励
///
/// POST /api/rewards
pub async fn create_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRewardRequest>,
) -> Result<Json<ApiResponse<Reward>>> {
    req.validate()?;
    if req.valid_until.is_some_and(|until| until < Utc::now()) {
        return Err(ApiError::Validation("有效期不能早于当前时间".to_string()));
    }

    let municipality_id = target_municipality(&claims, req.municipality_id)?;
    state
        .repos
        .municipalities
        .get(municipality_id)
        .await?
        .ok_or(RecyclingError::MunicipalityNotFound(municipality_id))?;

    let reward = state
        .repos
        .rewards
        .create(&NewReward {
            municipality_id,
            name: req.name,
            description: req.description,
            points_cost: req.points_cost,
            category: req.category,
            stock: req.stock,
            valid_until: req.valid_until,
        })
        .await?;

    info!(
        reward_id = reward.id,
        municipality_id,
        points_cost = reward.points_cost,
        "奖励已创建"
    );
    Ok(Json(ApiResponse::success(reward)))
}

/// PATCH /api/rewards/{id}
pub async fn update_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(changes): Json<RewardChanges>,
) -> Result<Json<ApiResponse<Reward>>> {
    scoped_reward(&state, &claims, id).await?;
    validate_changes(&changes)?;

    let reward = state
        .repos
        .rewards
        .update(id, &changes)
        .await?
        .ok_or(RecyclingError::RewardNotFound(id))?;
    info!(reward_id = id, "奖励已更新");
    Ok(Json(ApiResponse::success(reward)))
}

/// 下架奖励
///
/// DELETE /api/rewards/{id}
pub async fn deactivate_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Reward>>> {
    scoped_reward(&state, &claims, id).await?;
    let reward = state
        .repos
        .rewards
        .deactivate(id)
        .await?
        .ok_or(RecyclingError::RewardNotFound(id))?;
    info!(reward_id = id, operator = %claims.sub, "奖励已下架");
    Ok(Json(ApiResponse::success(reward)))
}

/// 市民兑换奖励
///
/// POST /api/rewards/{id}/redeem
pub async fn redeem_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RedemptionReceipt>>> {
    let receipt = state
        .redemption_service
        .redeem(claims.user_id()?, id)
        .await?;
    Ok(Json(ApiResponse::success_with_message(receipt, "兑换成功")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_changes() {
        assert!(validate_changes(&RewardChanges::default()).is_ok());

        let changes = RewardChanges {
            points_cost: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            validate_changes(&changes),
            Err(ApiError::Validation(_))
        ));

        let changes = RewardChanges {
            stock: Some(-3),
            ..Default::default()
        };
        assert!(validate_changes(&changes).is_err());

        let changes = RewardChanges {
            name: Some("  ".to_string()),
            points_cost: Some(150),
            ..Default::default()
        };
        assert!(validate_changes(&changes).is_err());
    }

    #[test]
    fn test_clear_valid_until_changes() {
        let changes: RewardChanges =
            serde_json::from_str(r#"{"clearValidUntil": true}"#).unwrap();
        assert!(changes.clear_valid_until);
        assert!(changes.valid_until.is_none());
        assert!(validate_changes(&changes).is_ok());

        // 未传该字段时保持原有效期
        let changes: RewardChanges = serde_json::from_str(r#"{"stock": 5}"#).unwrap();
        assert!(!changes.clear_valid_until);

        let changes = RewardChanges {
            valid_until: Some(chrono::Utc::now()),
            clear_valid_until: true,
            ..Default::default()
        };
        assert!(matches!(
            validate_changes(&changes),
            Err(ApiError::Validation(_))
        ));
    }
}
