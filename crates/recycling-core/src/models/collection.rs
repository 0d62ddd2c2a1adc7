//! 回收投放记录实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collector::WasteCollector;
use super::enums::{RecyclableType, VerificationMethod};
use super::reward::RewardTransaction;

/// 一次回收投放
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WasteCollection {
    pub id: i64,
    pub user_id: i64,
    pub collector_id: i64,
    pub municipality_id: i64,
    /// 重量（kg），恒大于 0
    pub weight: f64,
    pub recyclable_type: RecyclableType,
    pub points: i64,
    pub verified: bool,
    pub verification_method: Option<VerificationMethod>,
    pub rfid_card: Option<String>,
    /// 投放时间
    pub created_at: DateTime<Utc>,
}

/// 已通过前置校验、待写库的投放
///
/// 仓储在事务内会再次校验回收点状态与剩余容量
#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub user_id: i64,
    pub collector_id: i64,
    pub municipality_id: i64,
    pub weight: f64,
    pub recyclable_type: RecyclableType,
    pub points: i64,
    pub verification_method: Option<VerificationMethod>,
    pub rfid_card: Option<String>,
    pub description: String,
}

/// 投放事务的写入结果
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub collection: WasteCollection,
    pub transaction: RewardTransaction,
    /// 更新后的回收点
    pub collector: WasteCollector,
}

/// 投放列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    pub user_id: Option<i64>,
    pub collector_id: Option<i64>,
    pub municipality_id: Option<i64>,
    pub recyclable_type: Option<RecyclableType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn collection(
        id: i64,
        user_id: i64,
        collector_id: i64,
        weight: f64,
        recyclable_type: RecyclableType,
        created_at: DateTime<Utc>,
    ) -> WasteCollection {
        WasteCollection {
            id,
            user_id,
            collector_id,
            municipality_id: 1,
            weight,
            recyclable_type,
            points: (weight * 20.0).floor() as i64,
            verified: false,
            verification_method: None,
            rfid_card: None,
            created_at,
        }
    }
}
