//! 用户仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::traits::UserRepositoryTrait;
use crate::error::{RecyclingError, Result};
use crate::models::{NewUser, User, UserChanges, UserFilter, UserRole};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, role, municipality_id,
    phone, address, city, zip_code, is_active, failed_login_attempts,
    locked_until, last_login_at, created_at, updated_at
"#;

/// 用户仓储
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// 邮箱不区分大小写
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, user), fields(email = %user.email, role = ?user.role))]
    pub async fn create(&self, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role,
                               municipality_id, phone, address, city, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.municipality_id)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.zip_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RecyclingError::from_unique_violation(e, format!("邮箱已被注册: {}", user.email)))
    }

    pub async fn update(&self, id: i64, changes: &UserChanges) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name  = COALESCE($3, last_name),
                phone      = COALESCE($4, phone),
                address    = COALESCE($5, address),
                city       = COALESCE($6, city),
                zip_code   = COALESCE($7, zip_code),
                is_active  = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(&changes.city)
        .bind(&changes.zip_code)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn list(
        &self,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        let pattern = filter.q.as_ref().map(|q| format!("%{}%", q.trim()));
        let where_clause = r#"
            WHERE ($1::bigint IS NULL OR municipality_id = $1)
              AND ($2::varchar IS NULL OR role = $2)
              AND ($3::text IS NULL
                   OR email ILIKE $3
                   OR first_name ILIKE $3
                   OR last_name ILIKE $3)
              AND ($4::boolean IS NULL OR is_active = $4)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {where_clause}"))
            .bind(filter.municipality_id)
            .bind(filter.role)
            .bind(&pattern)
            .bind(filter.is_active)
            .fetch_one(&self.pool)
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users {where_clause} ORDER BY id ASC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.municipality_id)
        .bind(filter.role)
        .bind(&pattern)
        .bind(filter.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    pub async fn list_citizens(&self, municipality_id: Option<i64>) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = 'CITIZEN'
              AND ($1::bigint IS NULL OR municipality_id = $1)
            ORDER BY id ASC
            "#
        ))
        .bind(municipality_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// 失败次数达到上限时写入锁定截止时间并清零计数
    pub async fn record_login_failure(
        &self,
        id: i64,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                failed_login_attempts = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN 0
                    ELSE failed_login_attempts + 1
                END,
                locked_until = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN $3
                    ELSE locked_until
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn record_login_success(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        self.get(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_by_email(email).await
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        self.create(user).await
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<Option<User>> {
        self.update(id, changes).await
    }

    async fn list(&self, filter: &UserFilter, limit: i64, offset: i64) -> Result<(Vec<User>, i64)> {
        self.list(filter, limit, offset).await
    }

    async fn list_citizens(&self, municipality_id: Option<i64>) -> Result<Vec<User>> {
        self.list_citizens(municipality_id).await
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        self.count_by_role(role).await
    }

    async fn record_login_failure(
        &self,
        id: i64,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<()> {
        self.record_login_failure(id, max_attempts, lock_until).await
    }

    async fn record_login_success(&self, id: i64) -> Result<()> {
        self.record_login_success(id).await
    }
}
