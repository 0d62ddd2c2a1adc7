//! 回收投放仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use super::collector_repo::COLLECTOR_COLUMNS;
use super::traits::CollectionRepositoryTrait;
use super::transaction_repo::TRANSACTION_COLUMNS;
use crate::error::{RecyclingError, Result};
use crate::models::{
    CollectionFilter, DepositOutcome, NewDeposit, RewardTransaction, VerificationMethod,
    WasteCollection, WasteCollector,
};

const COLLECTION_COLUMNS: &str = r#"
    id, user_id, collector_id, municipality_id, weight, recyclable_type, points,
    verified, verification_method, rfid_card, created_at
"#;

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::bigint IS NULL OR user_id = $1)
      AND ($2::bigint IS NULL OR collector_id = $2)
      AND ($3::bigint IS NULL OR municipality_id = $3)
      AND ($4::varchar IS NULL OR recyclable_type = $4)
      AND ($5::timestamptz IS NULL OR created_at >= $5)
      AND ($6::timestamptz IS NULL OR created_at < $6)
"#;

/// 回收投放仓储
pub struct CollectionRepository {
    pool: PgPool,
}

impl CollectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<WasteCollection>> {
        let collection = sqlx::query_as::<_, WasteCollection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM waste_collections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collection)
    }

    pub async fn list(
        &self,
        filter: &CollectionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WasteCollection>, i64)> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM waste_collections {FILTER_CLAUSE}"
        ))
        .bind(filter.user_id)
        .bind(filter.collector_id)
        .bind(filter.municipality_id)
        .bind(filter.recyclable_type)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        let collections = sqlx::query_as::<_, WasteCollection>(&format!(
            r#"
            SELECT {COLLECTION_COLUMNS} FROM waste_collections {FILTER_CLAUSE}
            ORDER BY created_at DESC, id DESC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.collector_id)
        .bind(filter.municipality_id)
        .bind(filter.recyclable_type)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((collections, total))
    }

    pub async fn list_all(&self, filter: &CollectionFilter) -> Result<Vec<WasteCollection>> {
        let collections = sqlx::query_as::<_, WasteCollection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM waste_collections {FILTER_CLAUSE} ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.user_id)
        .bind(filter.collector_id)
        .bind(filter.municipality_id)
        .bind(filter.recyclable_type)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(collections)
    }

    /// 投放事务
    ///
    /// 1. 锁定回收点行并校验状态与剩余容量
    /// 2. 写入投放记录
    /// 3. 写入 EARNED 积分流水
    /// 4. 累加回收点重量
    /// 5. 更新 RFID 卡使用记录
    #[instrument(skip(self, deposit), fields(user_id = deposit.user_id, collector_id = deposit.collector_id, weight = deposit.weight))]
    pub async fn record_deposit(&self, deposit: &NewDeposit) -> Result<DepositOutcome> {
        let mut tx = self.pool.begin().await?;

        let collector = Self::lock_collector(&mut tx, deposit.collector_id).await?;
        if !collector.accepts_deposits() {
            return Err(RecyclingError::CollectorUnavailable {
                collector_id: collector.id,
                status: collector.status.as_str().to_string(),
            });
        }
        if !collector.can_accept(deposit.weight) {
            return Err(RecyclingError::CollectorFull {
                collector_id: collector.id,
                remaining: collector.remaining_capacity(),
            });
        }

        let collection = sqlx::query_as::<_, WasteCollection>(&format!(
            r#"
            INSERT INTO waste_collections (user_id, collector_id, municipality_id, weight,
                                           recyclable_type, points, verified,
                                           verification_method, rfid_card)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8)
            RETURNING {COLLECTION_COLUMNS}
            "#
        ))
        .bind(deposit.user_id)
        .bind(deposit.collector_id)
        .bind(deposit.municipality_id)
        .bind(deposit.weight)
        .bind(deposit.recyclable_type)
        .bind(deposit.points)
        .bind(deposit.verification_method)
        .bind(&deposit.rfid_card)
        .fetch_one(&mut *tx)
        .await?;

        let transaction = sqlx::query_as::<_, RewardTransaction>(&format!(
            r#"
            INSERT INTO reward_transactions (user_id, collection_id, transaction_type,
                                             points, description, status)
            VALUES ($1, $2, 'EARNED', $3, $4, 'COMPLETED')
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(deposit.user_id)
        .bind(collection.id)
        .bind(deposit.points)
        .bind(&deposit.description)
        .fetch_one(&mut *tx)
        .await?;

        let collector = sqlx::query_as::<_, WasteCollector>(&format!(
            r#"
            UPDATE waste_collectors
            SET current_weight = current_weight + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLLECTOR_COLUMNS}
            "#
        ))
        .bind(deposit.collector_id)
        .bind(deposit.weight)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(card_number) = &deposit.rfid_card {
            sqlx::query(
                r#"
                UPDATE rfid_cards
                SET usage_count = usage_count + 1, last_used = NOW()
                WHERE card_number = $1
                "#,
            )
            .bind(card_number)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(collection_id = collection.id, points = deposit.points, "投放已入账");

        Ok(DepositOutcome {
            collection,
            transaction,
            collector,
        })
    }

    async fn lock_collector(conn: &mut PgConnection, collector_id: i64) -> Result<WasteCollector> {
        sqlx::query_as::<_, WasteCollector>(&format!(
            "SELECT {COLLECTOR_COLUMNS} FROM waste_collectors WHERE id = $1 FOR UPDATE"
        ))
        .bind(collector_id)
        .fetch_optional(conn)
        .await?
        .ok_or(RecyclingError::CollectorNotFound(collector_id))
    }

    pub async fn verify(
        &self,
        id: i64,
        method: VerificationMethod,
    ) -> Result<Option<WasteCollection>> {
        let collection = sqlx::query_as::<_, WasteCollection>(&format!(
            r#"
            UPDATE waste_collections
            SET verified = TRUE, verification_method = $2
            WHERE id = $1
            RETURNING {COLLECTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(method)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collection)
    }
}

#[async_trait]
impl CollectionRepositoryTrait for CollectionRepository {
    async fn get(&self, id: i64) -> Result<Option<WasteCollection>> {
        self.get(id).await
    }

    async fn list(
        &self,
        filter: &CollectionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WasteCollection>, i64)> {
        self.list(filter, limit, offset).await
    }

    async fn list_all(&self, filter: &CollectionFilter) -> Result<Vec<WasteCollection>> {
        self.list_all(filter).await
    }

    async fn record_deposit(&self, deposit: &NewDeposit) -> Result<DepositOutcome> {
        self.record_deposit(deposit).await
    }

    async fn verify(
        &self,
        id: i64,
        method: VerificationMethod,
    ) -> Result<Option<WasteCollection>> {
        self.verify(id, method).await
    }
}
