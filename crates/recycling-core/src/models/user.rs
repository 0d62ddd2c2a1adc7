//! 用户实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::UserRole;

/// 平台用户（市民、市政管理员、系统管理员）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    /// bcrypt 哈希，永不序列化输出
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub municipality_id: Option<i64>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_citizen(&self) -> bool {
        self.role == UserRole::Citizen
    }

    /// 账户在给定时间点是否处于锁定期
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// 新建用户
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub municipality_id: Option<i64>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
}

/// 用户可修改字段，None 表示不修改
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub is_active: Option<bool>,
}

/// 用户列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub municipality_id: Option<i64>,
    pub role: Option<UserRole>,
    /// 按邮箱或姓名模糊匹配
    pub q: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn citizen(id: i64, municipality_id: i64) -> User {
        let now = Utc::now();
        User {
            id,
            email: format!("citizen{id}@metalix.test"),
            password_hash: "$2b$04$hash".to_string(),
            first_name: "Ana".to_string(),
            last_name: format!("Citizen{id}"),
            role: UserRole::Citizen,
            municipality_id: Some(municipality_id),
            phone: None,
            address: None,
            city: None,
            zip_code: None,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = fixtures::citizen(1, 1);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ana");
        assert_eq!(json["role"], "CITIZEN");
    }

    #[test]
    fn test_lock_window() {
        let now = Utc::now();
        let mut user = fixtures::citizen(1, 1);
        assert!(!user.is_locked(now));

        user.locked_until = Some(now + Duration::minutes(30));
        assert!(user.is_locked(now));
        assert!(!user.is_locked(now + Duration::minutes(31)));
    }
}
