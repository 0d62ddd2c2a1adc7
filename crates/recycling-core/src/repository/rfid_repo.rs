//! RFID 卡仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::traits::RfidCardRepositoryTrait;
use crate::error::{RecyclingError, Result};
use crate::models::{RfidCard, RfidCardFilter};

const CARD_COLUMNS: &str = "id, card_number, user_id, is_active, issued_at, last_used, usage_count";

/// RFID 卡仓储
pub struct RfidCardRepository {
    pool: PgPool,
}

impl RfidCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<RfidCard>> {
        let card = sqlx::query_as::<_, RfidCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM rfid_cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    pub async fn find_by_number(&self, card_number: &str) -> Result<Option<RfidCard>> {
        let card = sqlx::query_as::<_, RfidCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM rfid_cards WHERE card_number = $1"
        ))
        .bind(card_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    pub async fn find_active_by_user(&self, user_id: i64) -> Result<Option<RfidCard>> {
        let card = sqlx::query_as::<_, RfidCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM rfid_cards WHERE user_id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    pub async fn count_by_user(&self, user_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM rfid_cards WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn list(
        &self,
        filter: &RfidCardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RfidCard>, i64)> {
        let where_clause = r#"
            LEFT JOIN users u ON u.id = c.user_id
            WHERE ($1::bigint IS NULL OR c.user_id = $1)
              AND ($2::bigint IS NULL OR u.municipality_id = $2)
              AND ($3::boolean IS NULL OR c.is_active = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM rfid_cards c {where_clause}"))
            .bind(filter.user_id)
            .bind(filter.municipality_id)
            .bind(filter.is_active)
            .fetch_one(&self.pool)
            .await?;

        let cards = sqlx::query_as::<_, RfidCard>(&format!(
            r#"
            SELECT c.id, c.card_number, c.user_id, c.is_active, c.issued_at, c.last_used, c.usage_count
            FROM rfid_cards c {where_clause}
            ORDER BY c.id ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.municipality_id)
        .bind(filter.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((cards, total))
    }

    /// 停用旧卡与发放新卡在同一事务内完成，保证每个用户最多一张有效卡
    #[instrument(skip(self))]
    pub async fn issue(&self, user_id: i64, card_number: &str) -> Result<RfidCard> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE rfid_cards SET is_active = FALSE WHERE user_id = $1 AND is_active = TRUE")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let card = sqlx::query_as::<_, RfidCard>(&format!(
            r#"
            INSERT INTO rfid_cards (card_number, user_id, is_active, issued_at)
            VALUES ($1, $2, TRUE, NOW())
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(card_number)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RecyclingError::from_unique_violation(e, format!("卡号已存在: {card_number}")))?;

        tx.commit().await?;

        Ok(card)
    }

    pub async fn deactivate(&self, id: i64) -> Result<Option<RfidCard>> {
        let card = sqlx::query_as::<_, RfidCard>(&format!(
            "UPDATE rfid_cards SET is_active = FALSE WHERE id = $1 RETURNING {CARD_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }
}

#[async_trait]
impl RfidCardRepositoryTrait for RfidCardRepository {
    async fn get(&self, id: i64) -> Result<Option<RfidCard>> {
        self.get(id).await
    }

    async fn find_by_number(&self, card_number: &str) -> Result<Option<RfidCard>> {
        self.find_by_number(card_number).await
    }

    async fn find_active_by_user(&self, user_id: i64) -> Result<Option<RfidCard>> {
        self.find_active_by_user(user_id).await
    }

    async fn count_by_user(&self, user_id: i64) -> Result<i64> {
        self.count_by_user(user_id).await
    }

    async fn list(
        &self,
        filter: &RfidCardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RfidCard>, i64)> {
        self.list(filter, limit, offset).await
    }

    async fn issue(&self, user_id: i64, card_number: &str) -> Result<RfidCard> {
        self.issue(user_id, card_number).await
    }

    async fn deactivate(&self, id: i64) -> Result<Option<RfidCard>> {
        self.deactivate(id).await
    }
}
