//! 奖励与积分流水实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{RewardCategory, TransactionStatus, TransactionType};

/// 可兑换奖励
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: i64,
    pub municipality_id: i64,
    pub name: String,
    pub description: String,
    /// 兑换所需积分，恒大于 0
    pub points_cost: i64,
    pub category: RewardCategory,
    pub is_active: bool,
    pub stock: i32,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| until < now)
    }

    pub fn has_stock(&self) -> bool {
        self.stock > 0
    }

    /// 是否可兑换（上架、未过期、有库存）
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && self.has_stock()
    }
}

#[derive(Debug, Clone)]
pub struct NewReward {
    pub municipality_id: i64,
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub category: RewardCategory,
    pub stock: i32,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub points_cost: Option<i64>,
    pub category: Option<RewardCategory>,
    pub is_active: Option<bool>,
    pub stock: Option<i32>,
    pub valid_until: Option<DateTime<Utc>>,
    /// 清除有效期，恢复为长期有效
    #[serde(default)]
    pub clear_valid_until: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RewardFilter {
    pub municipality_id: Option<i64>,
    pub category: Option<RewardCategory>,
    /// 仅返回上架且未过期的奖励
    pub available_only: bool,
}

/// 积分流水
///
/// points 带符号：EARNED 为正，REDEEMED 为负
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardTransaction {
    pub id: i64,
    pub user_id: i64,
    pub reward_id: Option<i64>,
    pub collection_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub points: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// 用户积分余额
///
/// 由积分流水推导：earned 只统计 EARNED，redeemed 只统计 COMPLETED 的 REDEEMED，
/// EXPIRED 与 REFUNDED 仅作历史记录，不参与计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoints {
    pub user_id: i64,
    /// 累计获得积分
    pub total_points: i64,
    pub available_points: i64,
    pub redeemed_points: i64,
    /// 最新流水时间，无流水时为计算时刻
    pub last_updated: DateTime<Utc>,
}

impl UserPoints {
    pub fn from_transactions(
        user_id: i64,
        transactions: &[RewardTransaction],
        now: DateTime<Utc>,
    ) -> Self {
        let earned: i64 = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Earned)
            .map(|t| t.points)
            .sum();
        let redeemed: i64 = transactions
            .iter()
            .filter(|t| {
                t.transaction_type == TransactionType::Redeemed
                    && t.status == TransactionStatus::Completed
            })
            .map(|t| t.points.abs())
            .sum();
        let last_updated = transactions
            .iter()
            .map(|t| t.created_at)
            .max()
            .unwrap_or(now);

        Self {
            user_id,
            total_points: earned,
            available_points: earned - redeemed,
            redeemed_points: redeemed,
            last_updated,
        }
    }
}

/// 积分流水列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<i64>,
    /// 按用户所属市政过滤
    pub municipality_id: Option<i64>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

/// 兑换的写入结果
#[derive(Debug, Clone)]
pub struct RedemptionOutcome {
    pub transaction: RewardTransaction,
    /// 锁内重算后扣除本次兑换的可用积分
    pub available_after: i64,
}

/// 取消兑换的写入结果
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    /// 已置为 CANCELLED 的原兑换流水
    pub cancelled: RewardTransaction,
    /// 新增的 REFUNDED 记录
    pub refund: RewardTransaction,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn reward(id: i64, municipality_id: i64, points_cost: i64, stock: i32) -> Reward {
        let now = Utc::now();
        Reward {
            id,
            municipality_id,
            name: format!("Voucher {id}"),
            description: "Desconto no mercado municipal".to_string(),
            points_cost,
            category: RewardCategory::Shopping,
            is_active: true,
            stock,
            valid_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transaction(
        id: i64,
        user_id: i64,
        transaction_type: TransactionType,
        points: i64,
        status: TransactionStatus,
    ) -> RewardTransaction {
        RewardTransaction {
            id,
            user_id,
            reward_id: None,
            collection_id: None,
            transaction_type,
            points,
            description: String::new(),
            status,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::models::enums::{TransactionStatus as S, TransactionType as T};

    #[test]
    fn test_empty_ledger_is_zero() {
        let now = Utc::now();
        let points = UserPoints::from_transactions(7, &[], now);
        assert_eq!(points.total_points, 0);
        assert_eq!(points.available_points, 0);
        assert_eq!(points.redeemed_points, 0);
        assert_eq!(points.last_updated, now);
    }

    #[test]
    fn test_ledger_formula() {
        let txs = vec![
            fixtures::transaction(1, 7, T::Earned, 100, S::Completed),
            fixtures::transaction(2, 7, T::Earned, 40, S::Completed),
            fixtures::transaction(3, 7, T::Redeemed, -50, S::Completed),
            // 待处理与已取消的兑换不计入
            fixtures::transaction(4, 7, T::Redeemed, -30, S::Pending),
            fixtures::transaction(5, 7, T::Redeemed, -20, S::Cancelled),
            fixtures::transaction(6, 7, T::Refunded, 20, S::Completed),
            fixtures::transaction(7, 7, T::Expired, -10, S::Completed),
        ];
        let points = UserPoints::from_transactions(7, &txs, Utc::now());
        assert_eq!(points.total_points, 140);
        assert_eq!(points.redeemed_points, 50);
        assert_eq!(points.available_points, 90);
    }

    #[test]
    fn test_redeemed_uses_absolute_value() {
        let txs = vec![
            fixtures::transaction(1, 7, T::Earned, 100, S::Completed),
            fixtures::transaction(2, 7, T::Redeemed, 30, S::Completed),
        ];
        let points = UserPoints::from_transactions(7, &txs, Utc::now());
        assert_eq!(points.redeemed_points, 30);
        assert_eq!(points.available_points, 70);
    }

    #[test]
    fn test_last_updated_is_newest_transaction() {
        let now = Utc::now();
        let mut old = fixtures::transaction(1, 7, T::Earned, 10, S::Completed);
        old.created_at = now - Duration::days(3);
        let mut newest = fixtures::transaction(2, 7, T::Earned, 10, S::Completed);
        newest.created_at = now - Duration::hours(1);
        let points = UserPoints::from_transactions(7, &[old, newest.clone()], now);
        assert_eq!(points.last_updated, newest.created_at);
    }

    #[test]
    fn test_reward_redeemable_rules() {
        let now = Utc::now();
        let mut reward = fixtures::reward(1, 1, 100, 3);
        assert!(reward.is_redeemable(now));

        reward.stock = 0;
        assert!(!reward.is_redeemable(now));

        reward.stock = 1;
        reward.valid_until = Some(now - Duration::hours(1));
        assert!(reward.is_expired(now));
        assert!(!reward.is_redeemable(now));

        reward.valid_until = Some(now + Duration::days(1));
        reward.is_active = false;
        assert!(!reward.is_redeemable(now));
    }
}
