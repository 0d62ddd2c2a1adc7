//! 积分流水仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::TransactionRepositoryTrait;
use crate::error::Result;
use crate::models::{RewardTransaction, TransactionFilter};

pub(crate) const TRANSACTION_COLUMNS: &str = r#"
    id, user_id, reward_id, collection_id, transaction_type, points, description,
    status, created_at
"#;

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::bigint IS NULL OR t.user_id = $1)
      AND ($2::bigint IS NULL OR u.municipality_id = $2)
      AND ($3::varchar IS NULL OR t.transaction_type = $3)
      AND ($4::varchar IS NULL OR t.status = $4)
"#;

const QUALIFIED_COLUMNS: &str = r#"
    t.id, t.user_id, t.reward_id, t.collection_id, t.transaction_type, t.points,
    t.description, t.status, t.created_at
"#;

/// 积分流水仓储
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<RewardTransaction>> {
        let transaction = sqlx::query_as::<_, RewardTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM reward_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// 用户全部流水，按时间倒序
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<RewardTransaction>> {
        let transactions = sqlx::query_as::<_, RewardTransaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM reward_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    pub async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RewardTransaction>, i64)> {
        let total: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*) FROM reward_transactions t
            JOIN users u ON u.id = t.user_id
            {FILTER_CLAUSE}
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.municipality_id)
        .bind(filter.transaction_type)
        .bind(filter.status)
        .fetch_one(&self.pool)
        .await?;

        let transactions = sqlx::query_as::<_, RewardTransaction>(&format!(
            r#"
            SELECT {QUALIFIED_COLUMNS} FROM reward_transactions t
            JOIN users u ON u.id = t.user_id
            {FILTER_CLAUSE}
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.municipality_id)
        .bind(filter.transaction_type)
        .bind(filter.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((transactions, total))
    }

    pub async fn list_all(&self, filter: &TransactionFilter) -> Result<Vec<RewardTransaction>> {
        let transactions = sqlx::query_as::<_, RewardTransaction>(&format!(
            r#"
            SELECT {QUALIFIED_COLUMNS} FROM reward_transactions t
            JOIN users u ON u.id = t.user_id
            {FILTER_CLAUSE}
            ORDER BY t.created_at DESC, t.id DESC
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.municipality_id)
        .bind(filter.transaction_type)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    async fn get(&self, id: i64) -> Result<Option<RewardTransaction>> {
        self.get(id).await
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<RewardTransaction>> {
        self.list_by_user(user_id).await
    }

    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RewardTransaction>, i64)> {
        self.list(filter, limit, offset).await
    }

    async fn list_all(&self, filter: &TransactionFilter) -> Result<Vec<RewardTransaction>> {
        self.list_all(filter).await
    }
}
