//! 奖励兑换服务
//!
//! ## 兑换流程
//!
//! 1. 用户校验（存在、启用、市民）
//! 2. 奖励校验（存在、上架、未过期、有库存、同市政）
//! 3. 余额预检（快速失败）
//! 4. 仓储事务内加锁重算余额并写入
//!
//! 第 3 步只是为了尽早给出错误，并发安全由第 4 步保证

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metalix_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::error::{RecyclingError, Result};
use crate::models::{CancellationOutcome, Reward, User, UserPoints};
use crate::repository::{
    RewardRepositoryTrait, TransactionRepositoryTrait, UserRepositoryTrait,
};
use crate::service::dto::RedemptionReceipt;

/// 奖励兑换服务
pub struct RedemptionService<UR, RR, TR>
where
    UR: UserRepositoryTrait,
    RR: RewardRepositoryTrait,
    TR: TransactionRepositoryTrait,
{
    user_repo: Arc<UR>,
    reward_repo: Arc<RR>,
    transaction_repo: Arc<TR>,
}

impl<UR, RR, TR> RedemptionService<UR, RR, TR>
where
    UR: UserRepositoryTrait,
    RR: RewardRepositoryTrait,
    TR: TransactionRepositoryTrait,
{
    pub fn new(user_repo: Arc<UR>, reward_repo: Arc<RR>, transaction_repo: Arc<TR>) -> Self {
        Self {
            user_repo,
            reward_repo,
            transaction_repo,
        }
    }

    /// 兑换奖励
    #[instrument(skip(self))]
    pub async fn redeem(&self, user_id: i64, reward_id: i64) -> Result<RedemptionReceipt> {
        let started = Instant::now();
        let result = self.execute_redemption(user_id, reward_id).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(receipt) => {
                metrics::record_redemption("success", elapsed);
                info!(
                    user_id,
                    reward_id,
                    transaction_id = receipt.transaction.id,
                    points = receipt.points_spent,
                    "奖励兑换成功"
                );
            }
            Err(e) => {
                metrics::record_redemption(e.error_code(), elapsed);
                if e.is_business_error() {
                    warn!(user_id, reward_id, error = %e, "奖励兑换被拒绝");
                }
            }
        }

        result
    }

    async fn execute_redemption(&self, user_id: i64, reward_id: i64) -> Result<RedemptionReceipt> {
        let now = Utc::now();

        let user = self.validate_user(user_id).await?;
        let reward = self.validate_reward(reward_id, &user).await?;

        let history = self.transaction_repo.list_by_user(user_id).await?;
        let balance = UserPoints::from_transactions(user_id, &history, now);
        if balance.available_points < reward.points_cost {
            return Err(RecyclingError::InsufficientPoints {
                required: reward.points_cost,
                available: balance.available_points,
            });
        }

        // 回执余额取锁内重算的结果，并发兑换时预检余额已过期
        let outcome = self.reward_repo.redeem(user_id, reward_id, now).await?;

        Ok(RedemptionReceipt {
            reward_name: reward.name,
            points_spent: outcome.transaction.points.abs(),
            available_points: outcome.available_after,
            transaction: outcome.transaction,
        })
    }

    async fn validate_user(&self, user_id: i64) -> Result<User> {
        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(RecyclingError::UserNotFound(user_id))?;

        if !user.is_active {
            return Err(RecyclingError::UserInactive(user_id));
        }
        if !user.is_citizen() {
            return Err(RecyclingError::NotACitizen(user_id));
        }
        Ok(user)
    }

    async fn validate_reward(&self, reward_id: i64, user: &User) -> Result<Reward> {
        let reward = self
            .reward_repo
            .get(reward_id)
            .await?
            .ok_or(RecyclingError::RewardNotFound(reward_id))?;

        if !reward.is_active {
            return Err(RecyclingError::RewardInactive(reward_id));
        }
        if reward.is_expired(Utc::now()) {
            return Err(RecyclingError::RewardExpired(reward_id));
        }
        if !reward.has_stock() {
            return Err(RecyclingError::RewardOutOfStock(reward_id));
        }
        if user.municipality_id != Some(reward.municipality_id) {
            return Err(RecyclingError::RewardNotInMunicipality {
                reward_id,
                municipality_id: user.municipality_id.unwrap_or_default(),
            });
        }
        Ok(reward)
    }

    /// 取消兑换，退还积分并恢复库存
    #[instrument(skip(self))]
    pub async fn cancel(&self, transaction_id: i64) -> Result<CancellationOutcome> {
        let outcome = self.reward_repo.cancel_redemption(transaction_id).await?;
        info!(
            transaction_id,
            refund_id = outcome.refund.id,
            points = outcome.refund.points,
            "兑换已取消"
        );
        Ok(outcome)
    }
}
