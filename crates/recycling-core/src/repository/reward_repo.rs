//! 奖励仓储
//!
//! 除奖励 CRUD 外，负责兑换与取消兑换两个需要事务保证的写操作

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use super::traits::RewardRepositoryTrait;
use super::transaction_repo::TRANSACTION_COLUMNS;
use crate::error::{RecyclingError, Result};
use crate::models::{
    CancellationOutcome, NewReward, RedemptionOutcome, Reward, RewardChanges, RewardFilter,
    RewardTransaction, TransactionStatus, TransactionType, UserPoints,
};

const REWARD_COLUMNS: &str = r#"
    id, municipality_id, name, description, points_cost, category, is_active, stock,
    valid_until, created_at, updated_at
"#;

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::bigint IS NULL OR municipality_id = $1)
      AND ($2::varchar IS NULL OR category = $2)
      AND ($3 = FALSE OR (is_active = TRUE AND (valid_until IS NULL OR valid_until >= NOW())))
"#;

/// 奖励仓储
pub struct RewardRepository {
    pool: PgPool,
}

impl RewardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Reward>> {
        let reward = sqlx::query_as::<_, Reward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    pub async fn list(
        &self,
        filter: &RewardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Reward>, i64)> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM rewards {FILTER_CLAUSE}"))
            .bind(filter.municipality_id)
            .bind(filter.category)
            .bind(filter.available_only)
            .fetch_one(&self.pool)
            .await?;

        let rewards = sqlx::query_as::<_, Reward>(&format!(
            r#"
            SELECT {REWARD_COLUMNS} FROM rewards {FILTER_CLAUSE}
            ORDER BY points_cost ASC, id ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.municipality_id)
        .bind(filter.category)
        .bind(filter.available_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rewards, total))
    }

    pub async fn create(&self, reward: &NewReward) -> Result<Reward> {
        let reward = sqlx::query_as::<_, Reward>(&format!(
            r#"
            INSERT INTO rewards (municipality_id, name, description, points_cost, category,
                                 stock, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REWARD_COLUMNS}
            "#
        ))
        .bind(reward.municipality_id)
        .bind(&reward.name)
        .bind(&reward.description)
        .bind(reward.points_cost)
        .bind(reward.category)
        .bind(reward.stock)
        .bind(reward.valid_until)
        .fetch_one(&self.pool)
        .await?;

        Ok(reward)
    }

    pub async fn update(&self, id: i64, changes: &RewardChanges) -> Result<Option<Reward>> {
        let reward = sqlx::query_as::<_, Reward>(&format!(
            r#"
            UPDATE rewards SET
                name        = COALESCE($2, name),
                description = COALESCE($3, description),
                points_cost = COALESCE($4, points_cost),
                category    = COALESCE($5, category),
                is_active   = COALESCE($6, is_active),
                stock       = COALESCE($7, stock),
                valid_until = CASE WHEN $9 THEN NULL ELSE COALESCE($8, valid_until) END,
                updated_at  = NOW()
            WHERE id = $1
            RETURNING {REWARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.points_cost)
        .bind(changes.category)
        .bind(changes.is_active)
        .bind(changes.stock)
        .bind(changes.valid_until)
        .bind(changes.clear_valid_until)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    /// 下架奖励，历史流水仍引用该记录所以不做物理删除
    pub async fn deactivate(&self, id: i64) -> Result<Option<Reward>> {
        let reward = sqlx::query_as::<_, Reward>(&format!(
            r#"
            UPDATE rewards SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {REWARD_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    /// 兑换事务
    ///
    /// 用户行上的 `FOR UPDATE` 把同一用户的并发兑换串行化，
    /// 余额在锁内重新计算，因此不会透支。
    #[instrument(skip(self))]
    pub async fn redeem(
        &self,
        user_id: i64,
        reward_id: i64,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(RecyclingError::UserNotFound(user_id));
        }

        let reward = Self::lock_reward(&mut tx, reward_id).await?;
        if !reward.is_active {
            return Err(RecyclingError::RewardInactive(reward_id));
        }
        if reward.is_expired(now) {
            return Err(RecyclingError::RewardExpired(reward_id));
        }
        if !reward.has_stock() {
            return Err(RecyclingError::RewardOutOfStock(reward_id));
        }

        let history = sqlx::query_as::<_, RewardTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM reward_transactions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        let balance = UserPoints::from_transactions(user_id, &history, now);
        if balance.available_points < reward.points_cost {
            return Err(RecyclingError::InsufficientPoints {
                required: reward.points_cost,
                available: balance.available_points,
            });
        }

        let updated = sqlx::query("UPDATE rewards SET stock = stock - 1, updated_at = NOW() WHERE id = $1 AND stock > 0")
            .bind(reward_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(RecyclingError::RewardOutOfStock(reward_id));
        }

        let transaction = sqlx::query_as::<_, RewardTransaction>(&format!(
            r#"
            INSERT INTO reward_transactions (user_id, reward_id, transaction_type, points,
                                             description, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(reward_id)
        .bind(TransactionType::Redeemed)
        .bind(-reward.points_cost)
        .bind(format!("兑换奖励: {}", reward.name))
        .bind(TransactionStatus::Completed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let available_after = balance.available_points - reward.points_cost;
        info!(
            transaction_id = transaction.id,
            points = reward.points_cost,
            remaining = available_after,
            "兑换已提交"
        );

        Ok(RedemptionOutcome {
            transaction,
            available_after,
        })
    }

    async fn lock_reward(conn: &mut PgConnection, reward_id: i64) -> Result<Reward> {
        sqlx::query_as::<_, Reward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE id = $1 FOR UPDATE"
        ))
        .bind(reward_id)
        .fetch_optional(conn)
        .await?
        .ok_or(RecyclingError::RewardNotFound(reward_id))
    }

    /// 取消兑换事务
    ///
    /// 只有 COMPLETED 状态的 REDEEMED 流水可以取消
    #[instrument(skip(self))]
    pub async fn cancel_redemption(&self, transaction_id: i64) -> Result<CancellationOutcome> {
        let mut tx = self.pool.begin().await?;

        let original = sqlx::query_as::<_, RewardTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM reward_transactions WHERE id = $1 FOR UPDATE"
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RecyclingError::TransactionNotFound(transaction_id))?;

        if original.transaction_type != TransactionType::Redeemed {
            return Err(RecyclingError::InvalidTransactionState {
                transaction_id,
                reason: "只能取消兑换流水".to_string(),
            });
        }
        if original.status != TransactionStatus::Completed {
            return Err(RecyclingError::InvalidTransactionState {
                transaction_id,
                reason: "流水不是已完成状态".to_string(),
            });
        }

        let cancelled = sqlx::query_as::<_, RewardTransaction>(&format!(
            r#"
            UPDATE reward_transactions SET status = $2
            WHERE id = $1
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction_id)
        .bind(TransactionStatus::Cancelled)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(reward_id) = original.reward_id {
            sqlx::query("UPDATE rewards SET stock = stock + 1, updated_at = NOW() WHERE id = $1")
                .bind(reward_id)
                .execute(&mut *tx)
                .await?;
        }

        let refund = sqlx::query_as::<_, RewardTransaction>(&format!(
            r#"
            INSERT INTO reward_transactions (user_id, reward_id, transaction_type, points,
                                             description, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(original.user_id)
        .bind(original.reward_id)
        .bind(TransactionType::Refunded)
        .bind(original.points.abs())
        .bind(format!("取消兑换退还: #{transaction_id}"))
        .bind(TransactionStatus::Completed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CancellationOutcome { cancelled, refund })
    }
}

#[async_trait]
impl RewardRepositoryTrait for RewardRepository {
    async fn get(&self, id: i64) -> Result<Option<Reward>> {
        self.get(id).await
    }

    async fn list(
        &self,
        filter: &RewardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Reward>, i64)> {
        self.list(filter, limit, offset).await
    }

    async fn create(&self, reward: &NewReward) -> Result<Reward> {
        self.create(reward).await
    }

    async fn update(&self, id: i64, changes: &RewardChanges) -> Result<Option<Reward>> {
        self.update(id, changes).await
    }

    async fn deactivate(&self, id: i64) -> Result<Option<Reward>> {
        self.deactivate(id).await
    }

    async fn redeem(
        &self,
        user_id: i64,
        reward_id: i64,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome> {
        self.redeem(user_id, reward_id, now).await
    }

    async fn cancel_redemption(&self, transaction_id: i64) -> Result<CancellationOutcome> {
        self.cancel_redemption(transaction_id).await
    }
}
