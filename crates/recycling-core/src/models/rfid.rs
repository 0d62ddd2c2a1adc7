//! RFID 卡实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 市民身份识别卡
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RfidCard {
    pub id: i64,
    pub card_number: String,
    pub user_id: Option<i64>,
    pub is_active: bool,
    pub issued_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: i32,
}

impl RfidCard {
    /// 生成卡号：首张卡为 `RFID001`，第 n 张（n >= 2）为 `RFID001-n`
    pub fn number_for(user_id: i64, sequence: i64) -> String {
        if sequence <= 1 {
            format!("RFID{user_id:03}")
        } else {
            format!("RFID{user_id:03}-{sequence}")
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RfidCardFilter {
    pub user_id: Option<i64>,
    /// 按持卡人所属市政过滤
    pub municipality_id: Option<i64>,
    pub is_active: Option<bool>,
}
